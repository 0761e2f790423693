use crate::ComboRules;

/// Consecutive clears inside the combo window.
#[derive(Debug, Clone, Default)]
pub struct ComboTracker {
    count: u32,
    since_last: f32,
}

impl ComboTracker {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn advance(&mut self, rules: &ComboRules) -> u32 {
        if self.count == 0 || self.since_last > rules.window_secs {
            self.count = 1;
        } else {
            self.count += 1;
        }
        self.since_last = 0.0;
        self.count
    }

    pub fn tick(&mut self, dt: f32, rules: &ComboRules) {
        if self.count == 0 {
            return;
        }
        self.since_last += dt;
        if self.since_last > rules.window_secs {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.since_last = 0.0;
    }
}
