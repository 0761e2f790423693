use serde::{Deserialize, Serialize};

/// What a candidate move achieves on its target window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveClass {
    Plain,
    Pair,
    Gold,
    Triplet,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveWeights {
    pub triplet: f64,
    pub gold: f64,
    pub pair: f64,
    pub plain: f64,
    /// Bonus for emptying a source window so its queue steps forward.
    pub reveal: f64,
    /// Penalty for filling a box that then has no empty slot left.
    pub saturate: f64,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            triplet: 100.0,
            gold: 60.0,
            pair: 10.0,
            plain: 1.0,
            reveal: 3.0,
            saturate: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveFacts {
    pub class: MoveClass,
    pub empties_source: bool,
    pub saturates_target: bool,
}

pub fn move_score(facts: MoveFacts, weights: MoveWeights) -> f64 {
    let base = match facts.class {
        MoveClass::Triplet => weights.triplet,
        MoveClass::Gold => weights.gold,
        MoveClass::Pair => weights.pair,
        MoveClass::Plain => weights.plain,
    };
    let mut score = base;
    if facts.empties_source {
        score += weights.reveal;
    }
    if facts.saturates_target && facts.class != MoveClass::Triplet {
        score -= weights.saturate;
    }
    score
}
