use crate::MoveWeights;
use boxmatch_core::BoardRules;

#[derive(Debug, Clone)]
pub struct AutoplayConfig {
    pub seed: u64,
    pub max_steps: u32,
    /// Simulated seconds that pass between two moves.
    pub step_secs: f32,
    pub rules: BoardRules,
    pub weights: MoveWeights,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            seed: 0xC0FFEE,
            max_steps: 600,
            step_secs: 0.5,
            rules: BoardRules::instant(),
            weights: MoveWeights::default(),
        }
    }
}
