use crate::{EntityHandle, Kind, Token};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    FullBoard,
    TimeOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    Clear,
    Failed(FailReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageEvent {
    StageLoaded {
        boxes: usize,
        dispensers: usize,
        remaining: i64,
        hard_mode: bool,
    },
    TokenRevealed {
        handle: EntityHandle,
        slot: usize,
        token: Token,
        hidden: bool,
    },
    BoxCleared {
        handle: EntityHandle,
        kind: Kind,
        remaining: i64,
    },
    NoneCascade { handle: EntityHandle, steps: u32 },
    GoldCollected {
        handle: EntityHandle,
        gold: u32,
        remaining: i64,
    },
    BatchDispensed { handle: EntityHandle, wave: u32 },
    LockChanged { handle: EntityHandle, lock: u8 },
    BoxUnlocked { handle: EntityHandle },
    BoxSoldOut { handle: EntityHandle },
    BoxGravityHidden { handle: EntityHandle },
    BoxDepleted { handle: EntityHandle },
    ComboAdvanced { combo: u32, stars: u32 },
    HammerUsed { kind: Kind, removed: u32, remaining: i64 },
    WandUsed { to: Kind },
    TimerTicked { remaining: u32 },
    TimeAdded { secs: u32, remaining: u32 },
    RailsStopped { secs: f32 },
    StageClear,
    StageFailed(FailReason),
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<StageEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: StageEvent) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = StageEvent> + '_ {
        self.queue.drain(..)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
