use crate::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComboRules {
    /// Seconds after a clear during which the next clear extends the combo.
    pub window_secs: f32,
    /// Stars awarded per clear, indexed by combo length (last entry repeats).
    pub coins: Vec<u32>,
}

impl ComboRules {
    pub fn coin_for(&self, combo: u32) -> u32 {
        if self.coins.is_empty() || combo == 0 {
            return 0;
        }
        let idx = (combo as usize - 1).min(self.coins.len() - 1);
        self.coins[idx]
    }
}

impl Default for ComboRules {
    fn default() -> Self {
        Self {
            window_secs: 6.0,
            coins: vec![1, 1, 2, 2, 3, 3, 4, 5],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardRules {
    /// Board-widths per chunk in the run-breaking shuffle.
    pub board_cut: usize,
    /// Leading chunks that are only one board wide.
    pub lead_chunks: usize,
    /// Box count used for chunking when the stage has a gravity shelf.
    pub full_board_box_count: usize,
    pub shuffle_max_attempts: u32,
    /// A hidden mark lands with probability `1 / hidden_chance_den` per visit.
    pub hidden_chance_den: u32,
    pub hammer_start: u32,
    pub clear_presentation_secs: f32,
    pub rail_speed: f32,
    pub rail_stop_secs: f32,
    pub box_size: Vec2,
    pub combo: ComboRules,
}

impl Default for BoardRules {
    fn default() -> Self {
        Self {
            board_cut: 2,
            lead_chunks: 2,
            full_board_box_count: 12,
            shuffle_max_attempts: 100,
            hidden_chance_den: 3,
            hammer_start: 1,
            clear_presentation_secs: 0.4,
            rail_speed: 0.8,
            rail_stop_secs: 2.5,
            box_size: Vec2::new(1.8, 1.0),
            combo: ComboRules::default(),
        }
    }
}

impl BoardRules {
    /// Rules with presentation waits disabled, used by simulations.
    pub fn instant() -> Self {
        Self {
            clear_presentation_secs: 0.0,
            ..Self::default()
        }
    }
}
