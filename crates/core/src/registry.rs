use crate::MemberKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Box,
    Gimmick,
    Rail,
    Shelf,
}

/// Where an entity lives inside the stage's storage vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySlot {
    Box(usize),
    Dispenser(usize),
    Rail(usize),
    Shelf(usize),
}

impl EntitySlot {
    pub fn kind(self) -> EntityKind {
        match self {
            EntitySlot::Box(_) => EntityKind::Box,
            EntitySlot::Dispenser(_) => EntityKind::Gimmick,
            EntitySlot::Rail(_) => EntityKind::Rail,
            EntitySlot::Shelf(_) => EntityKind::Shelf,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    next: u32,
    slots: HashMap<EntityHandle, EntitySlot>,
    members: HashMap<MemberKey, EntityHandle>,
}

impl Registry {
    pub fn allocate(&mut self, slot: EntitySlot, key: Option<MemberKey>) -> EntityHandle {
        let handle = EntityHandle(self.next);
        self.next += 1;
        self.slots.insert(handle, slot);
        if let Some(key) = key {
            self.members.insert(key, handle);
        }
        handle
    }

    pub fn resolve(&self, handle: EntityHandle) -> Option<EntitySlot> {
        self.slots.get(&handle).copied()
    }

    pub fn by_key(&self, key: MemberKey) -> Option<EntityHandle> {
        self.members.get(&key).copied()
    }
}
