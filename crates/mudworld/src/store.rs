//! The entity graph.
//!
//! Entities live in a generational arena and are addressed by [`EntityId`].
//! A freed slot may be reused, but its generation moves on, so an old handle
//! never resolves to the newcomer. Each entity sits in three structures at
//! once:
//!
//! - the key index (`type/id` -> handle),
//! - the global order (creation order, used by `objects` and saves),
//! - its parent's child list (most recently attached first).

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

use tracing::debug;

use crate::key::{EntityKey, Kind};
use crate::room::Room;

pub const INDEX_BUCKETS: usize = 8192;

/// Rolling string hash used by the key index: `h = b + (h << 6) + (h << 16) - h`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyHasher(u64);

impl Hasher for KeyHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = u64::from(b)
                .wrapping_add(self.0 << 6)
                .wrapping_add(self.0 << 16)
                .wrapping_sub(self.0);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

type KeyIndex = HashMap<EntityKey, EntityId, BuildHasherDefault<KeyHasher>>;

/// Bucket a key falls into in an index of [`INDEX_BUCKETS`] chains.
pub fn bucket(key: &EntityKey) -> usize {
    use std::hash::Hash;
    let mut h = KeyHasher::default();
    key.hash(&mut h);
    (h.finish() % INDEX_BUCKETS as u64) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Entity {
    key: EntityKey,
    title: Option<String>,
    room: Option<Room>,
    parent: Option<EntityId>,
    first_child: Option<EntityId>,
    prev_sibling: Option<EntityId>,
    next_sibling: Option<EntityId>,
    prev_all: Option<EntityId>,
    next_all: Option<EntityId>,
}

impl Entity {
    fn new(key: EntityKey) -> Self {
        let room = (key.kind() == Kind::Room).then(Room::default);
        Self {
            key,
            title: None,
            room,
            parent: None,
            first_child: None,
            prev_sibling: None,
            next_sibling: None,
            prev_all: None,
            next_all: None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Debug)]
pub struct World {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    index: KeyIndex,
    first: Option<EntityId>,
    last: Option<EntityId>,
    max_ids: [u64; Kind::ALL.len()],
}

impl World {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            index: KeyIndex::with_capacity_and_hasher(INDEX_BUCKETS, Default::default()),
            first: None,
            last: None,
            max_ids: [0; Kind::ALL.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_ref())
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_mut())
    }

    // Link fields of live entities; a missing entity here is a broken list.
    fn links(&mut self, id: EntityId) -> &mut Entity {
        match self.get_mut(id) {
            Some(e) => e,
            None => unreachable!("entity list links a freed handle"),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Entity for `key`, created on first use.
    pub fn find(&mut self, key: &EntityKey) -> EntityId {
        match self.lookup(key) {
            Some(id) => id,
            None => self.insert(key.clone()),
        }
    }

    pub fn lookup(&self, key: &EntityKey) -> Option<EntityId> {
        self.index.get(key).copied()
    }

    /// Create a new entity. Returns `None` when the key is already taken.
    pub fn create(&mut self, key: EntityKey) -> Option<EntityId> {
        if self.index.contains_key(&key) {
            return None;
        }
        Some(self.insert(key))
    }

    fn insert(&mut self, key: EntityKey) -> EntityId {
        let kind = key.kind();
        let max = &mut self.max_ids[kind.slot()];
        *max = (*max).max(key.number());

        let slot = match self.free_slots.pop() {
            Some(s) => s,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let generation = self.slots[slot as usize].generation;
        let id = EntityId { slot, generation };

        debug!(key = %key, "create entity");
        self.index.insert(key.clone(), id);
        let mut entity = Entity::new(key);
        entity.prev_all = self.last;
        self.slots[slot as usize].entity = Some(entity);
        match self.last {
            Some(last) => self.links(last).next_all = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        id
    }

    /// Highest numeric id seen for `kind`, counting freed entities.
    pub fn max_id(&self, kind: Kind) -> u64 {
        self.max_ids[kind.slot()]
    }

    /// Fresh numeric id for `kind`; `None` once the id space is used up.
    pub fn next_id(&self, kind: Kind) -> Option<u64> {
        self.max_id(kind).checked_add(1)
    }

    pub fn key(&self, id: EntityId) -> Option<&EntityKey> {
        self.get(id).map(|e| &e.key)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.get(id).and_then(|e| e.parent)
    }

    pub fn title(&self, id: EntityId) -> Option<&str> {
        self.get(id).and_then(|e| e.title.as_deref())
    }

    pub fn set_title(&mut self, id: EntityId, title: Option<String>) -> bool {
        match self.get_mut(id) {
            Some(e) => {
                e.title = title;
                true
            }
            None => false,
        }
    }

    pub fn room(&self, id: EntityId) -> Option<&Room> {
        self.get(id).and_then(|e| e.room.as_ref())
    }

    pub fn room_mut(&mut self, id: EntityId) -> Option<&mut Room> {
        self.get_mut(id).and_then(|e| e.room.as_mut())
    }

    /// Move `id` under `parent` (at the head of its children), or detach it
    /// with `None`. Nothing changes and false is returned when a handle is
    /// stale or the move would put an entity inside itself.
    pub fn reparent(&mut self, id: EntityId, parent: Option<EntityId>) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(p) = parent {
            if !self.contains(p) || self.is_within(p, id) {
                return false;
            }
        }
        self.detach(id);
        if let Some(p) = parent {
            let head = self.links(p).first_child;
            if let Some(h) = head {
                self.links(h).prev_sibling = Some(id);
            }
            let e = self.links(id);
            e.parent = Some(p);
            e.next_sibling = head;
            self.links(p).first_child = Some(id);
        }
        true
    }

    fn is_within(&self, mut id: EntityId, ancestor: EntityId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(p) => id = p,
                None => return false,
            }
        }
    }

    fn detach(&mut self, id: EntityId) {
        let e = self.links(id);
        let (parent, prev, next) = (e.parent.take(), e.prev_sibling.take(), e.next_sibling.take());
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(p) => self.links(p).next_sibling = next,
            None => self.links(parent).first_child = next,
        }
        if let Some(n) = next {
            self.links(n).prev_sibling = prev;
        }
    }

    /// Child of `parent` after `prev`; `None` starts from the first child.
    /// Ends early when `prev` no longer belongs to `parent`.
    pub fn next_child(&self, parent: EntityId, prev: Option<EntityId>) -> Option<EntityId> {
        match prev {
            None => self.get(parent)?.first_child,
            Some(prev) => {
                let e = self.get(prev)?;
                if e.parent != Some(parent) {
                    return None;
                }
                e.next_sibling
            }
        }
    }

    pub fn children(&self, parent: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut cur = self.next_child(parent, None);
        while let Some(c) = cur {
            out.push(c);
            cur = self.next_child(parent, Some(c));
        }
        out
    }

    /// Entity after `prev` in creation order; `None` starts from the oldest.
    pub fn next_all(&self, prev: Option<EntityId>) -> Option<EntityId> {
        match prev {
            None => self.first,
            Some(prev) => self.get(prev)?.next_all,
        }
    }

    pub fn all(&self) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.next_all(None);
        while let Some(id) = cur {
            out.push(id);
            cur = self.next_all(Some(id));
        }
        out
    }

    /// Destroy an entity. Its children are left without a parent.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        while let Some(c) = self.next_child(id, None) {
            self.detach(c);
        }

        let e = self.links(id);
        let (prev, next) = (e.prev_all.take(), e.next_all.take());
        match prev {
            Some(p) => self.links(p).next_all = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.links(n).prev_all = prev,
            None => self.last = prev,
        }

        let slot = &mut self.slots[id.slot as usize];
        let entity = slot.entity.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.slot);
        if let Some(entity) = entity {
            debug!(key = %entity.key, "free entity");
            self.index.remove(&entity.key);
        }
        true
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
