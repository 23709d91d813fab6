//! The burrow world model.
//!
//! - `key`: validated `type/id` entity keys.
//! - `store`: the entity graph (arena, key index, containment).
//! - `room`: per-room exit tables and the direction tables.
//! - `script`: saving rooms as a replayable command script.

pub mod key;
pub mod room;
pub mod script;
pub mod store;

pub use key::{EntityKey, KeyError, Kind};
pub use room::{Exit, ExitError, MAX_EXITS, Room};
pub use store::{EntityId, World};
