use std::collections::HashMap;

use mudworld::{EntityId, World};
use tracing::warn;

use crate::session::Session;

/// Every live session, keyed by its player entity.
///
/// Output goes through here so the server learns which connections have
/// something to flush.
#[derive(Debug, Default)]
pub struct Sessions {
    map: HashMap<EntityId, Session>,
    dirty: Vec<EntityId>,
}

impl Sessions {
    pub fn insert(&mut self, session: Session) {
        self.map.insert(session.player, session);
    }

    pub fn remove(&mut self, player: EntityId) -> Option<Session> {
        self.dirty.retain(|p| *p != player);
        self.map.remove(&player)
    }

    pub fn get(&self, player: EntityId) -> Option<&Session> {
        self.map.get(&player)
    }

    pub fn get_mut(&mut self, player: EntityId) -> Option<&mut Session> {
        self.map.get_mut(&player)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Sessions with fresh output since the last call.
    pub fn take_dirty(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.dirty)
    }

    fn mark(&mut self, player: EntityId) {
        if !self.dirty.contains(&player) {
            self.dirty.push(player);
        }
    }

    fn with_out(&mut self, player: EntityId, f: impl FnOnce(&mut Session) -> Result<(), mudtext::Overflow>) {
        let Some(s) = self.map.get_mut(&player) else {
            return;
        };
        if let Err(e) = f(s) {
            warn!(player = %s.label, dropped = e.dropped, "output buffer full");
        }
        self.mark(player);
    }

    pub fn tell(&mut self, player: EntityId, text: &str) {
        self.with_out(player, |s| s.out.push(text));
    }

    pub fn tell_raw(&mut self, player: EntityId, text: &str) {
        self.with_out(player, |s| s.out.push_raw(text));
    }

    /// Close the player's current paragraph.
    pub fn end(&mut self, player: EntityId) {
        self.with_out(player, |s| s.out.end());
    }

    pub fn highlight(&mut self, player: EntityId, words: &[String]) {
        if let Some(s) = self.map.get_mut(&player) {
            s.out.set_highlight(words.iter().cloned());
        }
    }

    pub fn clear_highlight(&mut self, player: EntityId) {
        if let Some(s) = self.map.get_mut(&player) {
            s.out.clear_highlight();
        }
    }

    /// Tell every player in `room` except `exclude`, each as a paragraph of
    /// its own.
    pub fn tell_room(&mut self, world: &World, room: EntityId, exclude: Option<EntityId>, text: &str) {
        for occupant in world.children(room) {
            if Some(occupant) == exclude || !self.map.contains_key(&occupant) {
                continue;
            }
            self.tell(occupant, text);
            self.end(occupant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_tells_skip_the_excluded_player() {
        let mut w = World::new();
        let room = w.find(&"room/1".parse().unwrap());
        let a = w.find(&"player/1".parse().unwrap());
        let b = w.find(&"player/2".parse().unwrap());
        let lamp = w.find(&"item/lamp".parse().unwrap());
        for id in [a, b, lamp] {
            w.reparent(id, Some(room));
        }

        let mut s = Sessions::default();
        s.insert(Session::detached(a, "player/1".into()));
        s.insert(Session::detached(b, "player/2".into()));

        s.tell_room(&w, room, Some(a), "Someone dug.");
        assert!(s.get(a).unwrap().out.is_empty());
        assert_eq!(s.get(b).unwrap().out.text(), "     Someone dug.  \n\n");
        assert_eq!(s.take_dirty(), vec![b]);
        assert!(s.take_dirty().is_empty());
    }

    #[test]
    fn removed_sessions_are_no_longer_dirty() {
        let mut w = World::new();
        let a = w.find(&"player/1".parse().unwrap());
        let mut s = Sessions::default();
        s.insert(Session::detached(a, "player/1".into()));
        s.tell(a, "hi.");
        assert!(s.remove(a).is_some());
        assert!(s.take_dirty().is_empty());
        s.tell(a, "ignored.");
        assert_eq!(s.len(), 0);
    }
}
