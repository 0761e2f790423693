use crate::{BoxState, DistributionPhase, EntityHandle};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    #[error("stage counts are inconsistent: {0}")]
    SpecInconsistent(String),
    #[error("pool exhausted during {phase:?}: needed {needed}, {remaining} left")]
    PoolExhausted {
        phase: DistributionPhase,
        needed: usize,
        remaining: usize,
    },
    #[error("{event} is undefined for {handle:?} in state {state:?}")]
    InvalidTransition {
        handle: EntityHandle,
        state: BoxState,
        event: &'static str,
    },
    #[error("box is locked")]
    Locked,
    #[error("box is presenting a clear")]
    Busy,
    #[error("slot is occupied")]
    SlotOccupied,
    #[error("slot is empty")]
    SlotEmpty,
    #[error("invalid slot index")]
    InvalidSlot,
    #[error("token is not gold")]
    NotGold,
    #[error("token cannot be moved")]
    NotMovable,
    #[error("entity does not accept tokens")]
    NotDroppable,
    #[error("unknown entity")]
    UnknownEntity,
    #[error("no stage document for index {0}")]
    MissingStage(u32),
    #[error("progress storage failed: {0}")]
    Storage(String),
    #[error("stage outcome already decided")]
    StageOver,
    #[error("stage was torn down")]
    TornDown,
}
