//! Text handling for burrow sessions.
//!
//! - `fmt`: incremental word-wrapping prose formatter with a bounded output
//!   buffer.
//! - `resolve`: abbreviation resolution for verbs and exit names, with
//!   spelling suggestions.

pub mod fmt;
pub mod resolve;

pub use fmt::{FmtBuf, Overflow};
pub use resolve::{Resolution, capitalize, resolve};
