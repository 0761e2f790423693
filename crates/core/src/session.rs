use crate::{BoardRules, ProgressStore, Stage, StageError, StageOutcome, StageSource};

/// Index of the final stage shipped with the game.
pub const MAX_STAGE: u32 = 350;
/// The lifetime clear counter wraps back to zero after this many clears.
pub const CLEAR_COUNT_WRAP: u32 = 50;

/// Extra seconds granted for consecutive clears.
pub fn streak_bonus_secs(streak: u32) -> u32 {
    match streak {
        0 => 0,
        1 => 10,
        2 => 20,
        _ => 30,
    }
}

/// Stage boundaries: loads the current stage and records its outcome.
#[derive(Debug)]
pub struct Session<S, P> {
    source: S,
    progress: P,
    rules: BoardRules,
    seed: u64,
}

impl<S: StageSource, P: ProgressStore> Session<S, P> {
    pub fn new(source: S, progress: P, rules: BoardRules) -> Self {
        Self {
            source,
            progress,
            rules,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn current_index(&self) -> u32 {
        self.progress.current_stage_index()
    }

    pub fn is_tutorial(&self) -> bool {
        self.current_index() == 0
    }

    pub fn is_last_stage(&self) -> bool {
        self.current_index() + 1 >= MAX_STAGE
    }

    pub fn load_current(&mut self) -> Result<Stage, StageError> {
        let index = self.current_index();
        let mut spec = self.source.stage(index)?;
        if index == 0 && spec.preset.is_none() {
            spec.apply_tutorial();
        }
        if spec.time_limit_secs > 0 {
            spec.time_limit_secs += streak_bonus_secs(self.progress.streak());
        }
        let seed = self.seed ^ u64::from(index).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        log::info!("loading stage {} (streak {})", index + 1, self.progress.streak());
        Stage::load(spec, self.rules.clone(), seed)
    }

    /// Records a decided outcome. Undecided stages leave progress untouched.
    pub fn finish(&mut self, stage: &Stage) -> Result<Option<StageOutcome>, StageError> {
        let outcome = stage.outcome();
        match outcome {
            Some(StageOutcome::Clear) => self.progress.record_clear()?,
            Some(StageOutcome::Failed(_)) => self.progress.record_fail()?,
            None => {}
        }
        Ok(outcome)
    }
}
