use std::borrow::Cow;

use mudtext::resolve;
use mudworld::{EntityId, World, room::expand_alias};

use crate::config::Config;
use crate::tell::Sessions;
use crate::verbs::Verb;

/// Everything a verb may touch while it runs for one player.
pub struct Ctx<'a> {
    pub world: &'a mut World,
    pub sessions: &'a mut Sessions,
    pub config: &'a Config,
    pub player: EntityId,
}

impl Ctx<'_> {
    pub fn tell(&mut self, text: &str) {
        self.sessions.tell(self.player, text);
    }

    /// Tell the player why a command did nothing, and count it.
    pub fn refuse(&mut self, text: &str) {
        self.tell(text);
        if let Some(s) = self.sessions.get_mut(self.player) {
            s.refused += 1;
        }
    }

    pub fn tell_raw(&mut self, text: &str) {
        self.sessions.tell_raw(self.player, text);
    }

    pub fn tell_room(&mut self, room: EntityId, exclude: Option<EntityId>, text: &str) {
        self.sessions.tell_room(self.world, room, exclude, text);
    }

    pub fn highlight(&mut self, words: &[String]) {
        self.sessions.highlight(self.player, words);
    }

    pub fn clear_highlight(&mut self) {
        self.sessions.clear_highlight(self.player);
    }

    /// The entity the player is in.
    pub fn here(&self) -> Option<EntityId> {
        self.world.parent(self.player)
    }

    /// The player's location, when it is a room.
    pub fn here_room(&self) -> Option<EntityId> {
        self.here().filter(|r| self.world.room(*r).is_some())
    }

    pub fn key_of(&self, id: EntityId) -> String {
        self.world
            .key(id)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Resolve `token` against `options`, telling the player why when no
    /// single option was picked.
    pub fn match_input<S: AsRef<str>>(&mut self, token: &str, options: &[S]) -> Option<usize> {
        let r = resolve(token, options);
        for line in r.prompt() {
            self.tell(&line);
        }
        if r.index().is_none() {
            if let Some(s) = self.sessions.get_mut(self.player) {
                s.refused += 1;
            }
        }
        r.index()
    }
}

/// Split off up to `limit - 1` words; the last piece keeps the rest of the
/// line, inner spacing included.
pub fn split_args(s: &str, limit: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while limit > 0 {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if out.len() + 1 == limit {
            out.push(rest.trim_end());
            break;
        }
        match rest.split_once(char::is_whitespace) {
            Some((head, tail)) => {
                out.push(head);
                rest = tail;
            }
            None => {
                out.push(rest);
                break;
            }
        }
    }
    out
}

/// `n` -> `go north`; other arguments are carried along.
pub fn expand_movement(line: &str) -> Cow<'_, str> {
    let line = line.trim_start();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    match expand_alias(word) {
        Some(dir) if rest.is_empty() => Cow::Owned(format!("go {dir}")),
        Some(dir) => Cow::Owned(format!("go {dir} {rest}")),
        None => Cow::Borrowed(line),
    }
}

/// Verbs the player may use where they stand.
pub fn available(ctx: &Ctx<'_>) -> Vec<Verb> {
    let in_room = ctx.here_room().is_some();
    Verb::ALL
        .into_iter()
        .filter(|v| in_room || !v.needs_room())
        .collect()
}

/// Run one complete command line for `ctx.player`.
pub fn run(ctx: &mut Ctx<'_>, line: &str) {
    let line = expand_movement(line);
    let (word, rest) = line.split_once(' ').unwrap_or((&*line, ""));
    if word.is_empty() {
        return;
    }

    let verbs = available(ctx);
    let names: Vec<&str> = verbs.iter().map(|v| v.name()).collect();
    if let Some(i) = ctx.match_input(word, &names) {
        verbs[i].execute(ctx, rest);
    }
}
