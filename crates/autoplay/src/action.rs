use boxmatch_core::SlotRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AutoMove {
    Move { from: SlotRef, to: SlotRef },
    CollectGold { at: SlotRef },
}

impl AutoMove {
    pub fn stable_key(&self) -> String {
        match self {
            Self::Move { from, to } => format!(
                "move:{}.{}->{}.{}",
                from.handle.0, from.slot, to.handle.0, to.slot
            ),
            Self::CollectGold { at } => format!("gold:{}.{}", at.handle.0, at.slot),
        }
    }

    pub fn short_label(&self) -> String {
        match self {
            Self::Move { from, to } => format!(
                "move #{}[{}] -> #{}[{}]",
                from.handle.0, from.slot, to.handle.0, to.slot
            ),
            Self::CollectGold { at } => format!("gold #{}[{}]", at.handle.0, at.slot),
        }
    }

    /// The move that would undo this one, if any.
    pub fn inverse(&self) -> Option<AutoMove> {
        match self {
            Self::Move { from, to } => Some(Self::Move {
                from: *to,
                to: *from,
            }),
            Self::CollectGold { .. } => None,
        }
    }
}
