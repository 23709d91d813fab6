//! `burrowio`: the I/O side of the burrow server.
//!
//! - `reactor`: single-threaded readiness/timer multiplexer, one event per pass,
//! - `clock`: the coarse tick clock shared by a reactor's timers,
//! - `line`: `\n` framing over a bounded per-connection buffer,
//! - `tcp`: listening socket setup.

pub mod clock;
pub mod line;
pub mod reactor;
pub mod tcp;

pub use line::{Framed, LineBuffer, frame};
pub use reactor::{Event, Handler, Reactor, ReactorError, Source, Token};
