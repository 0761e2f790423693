use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerTick {
    Idle,
    Ticked(u32),
    Expired,
}

/// Whole-second stage countdown fed by frame deltas.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: u32,
    carry: f32,
    running: bool,
    paused: bool,
    expired: bool,
}

impl Countdown {
    pub fn new(secs: u32) -> Self {
        Self {
            remaining: secs,
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.paused && !self.expired
    }

    /// Untimed stages never start.
    pub fn start(&mut self) {
        if self.remaining > 0 && !self.expired {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn add(&mut self, secs: u32) {
        if !self.expired {
            self.remaining = self.remaining.saturating_add(secs);
        }
    }

    pub fn tick(&mut self, dt: f32) -> TimerTick {
        if !self.is_running() {
            return TimerTick::Idle;
        }
        self.carry += dt;
        let mut ticked = false;
        while self.carry >= 1.0 && self.remaining > 0 {
            self.carry -= 1.0;
            self.remaining -= 1;
            ticked = true;
        }
        if self.remaining == 0 {
            self.expired = true;
            self.running = false;
            return TimerTick::Expired;
        }
        if ticked {
            TimerTick::Ticked(self.remaining)
        } else {
            TimerTick::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whole_seconds_and_honours_pause() {
        let mut timer = Countdown::new(3);
        assert_eq!(timer.tick(5.0), TimerTick::Idle);
        timer.start();
        assert_eq!(timer.tick(0.6), TimerTick::Idle);
        assert_eq!(timer.tick(0.6), TimerTick::Ticked(2));
        timer.pause();
        assert_eq!(timer.tick(10.0), TimerTick::Idle);
        timer.resume();
        timer.add(1);
        assert_eq!(timer.tick(2.0), TimerTick::Ticked(1));
        assert_eq!(timer.tick(1.0), TimerTick::Expired);
        assert_eq!(timer.tick(1.0), TimerTick::Idle);
    }
}
