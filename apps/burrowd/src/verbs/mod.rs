//! Player verbs. Each module exposes `execute(ctx, args)`.

mod clear;
mod collapse;
mod describe;
mod dig;
mod go;
mod goto;
mod look;
mod objects;
mod say;

use crate::dispatch::Ctx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Describe,
    Look,
    Go,
    Dig,
    Collapse,
    Say,
    Clear,
    Goto,
    Objects,
}

impl Verb {
    pub const ALL: [Verb; 9] = [
        Verb::Describe,
        Verb::Look,
        Verb::Go,
        Verb::Dig,
        Verb::Collapse,
        Verb::Say,
        Verb::Clear,
        Verb::Goto,
        Verb::Objects,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Verb::Describe => "describe",
            Verb::Look => "look",
            Verb::Go => "go",
            Verb::Dig => "dig",
            Verb::Collapse => "collapse",
            Verb::Say => "say",
            Verb::Clear => "clear",
            Verb::Goto => "goto",
            Verb::Objects => "objects",
        }
    }

    /// Only offered while the player stands in a room.
    pub fn needs_room(self) -> bool {
        matches!(self, Verb::Go | Verb::Dig | Verb::Collapse)
    }

    pub fn execute(self, ctx: &mut Ctx<'_>, args: &str) {
        match self {
            Verb::Describe => describe::execute(ctx, args),
            Verb::Look => look::execute(ctx, args),
            Verb::Go => go::execute(ctx, args),
            Verb::Dig => dig::execute(ctx, args),
            Verb::Collapse => collapse::execute(ctx, args),
            Verb::Say => say::execute(ctx, args),
            Verb::Clear => clear::execute(ctx, args),
            Verb::Goto => goto::execute(ctx, args),
            Verb::Objects => objects::execute(ctx, args),
        }
    }
}
