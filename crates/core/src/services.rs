//! Contracts for the collaborators a stage talks to: instance provisioning,
//! spatial overlap, presentation, progress storage and stage documents.

use crate::{EntityHandle, EntityKind, Region, StageError, StageEvent, StageOutcome, StageSpec};
use std::collections::BTreeSet;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerHandle(pub u64);

/// Hands out controller instances before an entity is initialised.
pub trait InstanceProvider: Debug {
    fn acquire(&mut self, kind: EntityKind, parent: Option<ControllerHandle>) -> ControllerHandle;
    /// Releasing an unknown or already released handle is a no-op.
    fn release(&mut self, handle: ControllerHandle);
}

/// Recycles released handles before minting new ones.
#[derive(Debug, Default)]
pub struct PooledProvider {
    next: u64,
    free: Vec<ControllerHandle>,
    live: BTreeSet<ControllerHandle>,
}

impl PooledProvider {
    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

impl InstanceProvider for PooledProvider {
    fn acquire(&mut self, _kind: EntityKind, _parent: Option<ControllerHandle>) -> ControllerHandle {
        let handle = self.free.pop().unwrap_or_else(|| {
            let handle = ControllerHandle(self.next);
            self.next += 1;
            handle
        });
        self.live.insert(handle);
        handle
    }

    fn release(&mut self, handle: ControllerHandle) {
        if self.live.remove(&handle) {
            self.free.push(handle);
        }
    }
}

/// Snapshot of one entity's footprint for overlap tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityBounds {
    pub handle: EntityHandle,
    pub kind: EntityKind,
    pub region: Region,
    pub active: bool,
}

pub trait OverlapQuery: Debug {
    fn query_overlap(&self, area: &Region, entities: &[EntityBounds]) -> Vec<EntityHandle>;
}

/// Axis-aligned overlap over active entity bounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundsOverlap;

impl OverlapQuery for BoundsOverlap {
    fn query_overlap(&self, area: &Region, entities: &[EntityBounds]) -> Vec<EntityHandle> {
        entities
            .iter()
            .filter(|e| e.active && e.region.overlaps(area))
            .map(|e| e.handle)
            .collect()
    }
}

/// Fire-and-forget presentation hooks.
pub trait PresentationSink {
    fn on_box_cleared(&mut self, _handle: EntityHandle) {}
    fn on_token_revealed(&mut self, _handle: EntityHandle, _slot: usize, _hidden: bool) {}
    fn on_combo_advanced(&mut self, _combo: u32) {}
    fn on_stage_outcome(&mut self, _outcome: StageOutcome) {}
}

pub fn forward_events<I>(events: I, sink: &mut dyn PresentationSink)
where
    I: IntoIterator<Item = StageEvent>,
{
    for event in events {
        match event {
            StageEvent::BoxCleared { handle, .. } => sink.on_box_cleared(handle),
            StageEvent::TokenRevealed {
                handle, slot, hidden, ..
            } => sink.on_token_revealed(handle, slot, hidden),
            StageEvent::ComboAdvanced { combo, .. } => sink.on_combo_advanced(combo),
            StageEvent::StageClear => sink.on_stage_outcome(StageOutcome::Clear),
            StageEvent::StageFailed(reason) => sink.on_stage_outcome(StageOutcome::Failed(reason)),
            _ => {}
        }
    }
}

/// Player progress, consulted only at stage boundaries.
pub trait ProgressStore {
    fn current_stage_index(&self) -> u32;
    fn streak(&self) -> u32;
    fn record_clear(&mut self) -> Result<(), StageError>;
    fn record_fail(&mut self) -> Result<(), StageError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProgress {
    pub stage_index: u32,
    pub streak: u32,
    pub clears: u32,
}

impl ProgressStore for MemoryProgress {
    fn current_stage_index(&self) -> u32 {
        self.stage_index
    }

    fn streak(&self) -> u32 {
        self.streak
    }

    fn record_clear(&mut self) -> Result<(), StageError> {
        self.stage_index += 1;
        self.streak += 1;
        if self.clears >= crate::CLEAR_COUNT_WRAP {
            self.clears = 0;
        }
        self.clears += 1;
        Ok(())
    }

    fn record_fail(&mut self) -> Result<(), StageError> {
        self.streak = 0;
        Ok(())
    }
}

pub trait StageSource {
    fn stage(&self, index: u32) -> Result<StageSpec, StageError>;
}
