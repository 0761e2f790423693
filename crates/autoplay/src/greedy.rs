use crate::{AutoplayConfig, AutoplayError, RunStatus, RunTrace, Simulator, StepRecord};
use boxmatch_core::{RngState, StageSpec};
use serde::{Deserialize, Serialize};

/// Plays one stage to an outcome (or the step cap) with the greedy policy.
pub fn run_autoplay(spec: &StageSpec, config: &AutoplayConfig) -> Result<RunTrace, AutoplayError> {
    let mut sim = Simulator::new(spec.clone(), config.rules.clone(), config.seed)?;
    sim.stage.drain_events();
    let mut rng = RngState::from_seed(config.seed.rotate_left(17) ^ 0xA5A5_5A5A);
    let mut steps = Vec::new();
    let mut avoid: Option<String> = None;
    let mut status = None;

    for step in 0..config.max_steps {
        if let Some(outcome) = sim.outcome() {
            status = Some(RunStatus::from_outcome(outcome));
            break;
        }
        let Some((action, facts)) = sim.choose(config.weights, &mut rng, avoid.as_deref()) else {
            status = Some(RunStatus::NoLegalMove);
            break;
        };
        let remaining_before = sim.remaining();
        let mut event_count = sim.apply(&action)?.len();
        if sim.outcome().is_none() {
            event_count += sim.advance(config.step_secs)?.len();
        }
        avoid = action.inverse().map(|mv| mv.stable_key());
        steps.push(StepRecord {
            step,
            action,
            class: facts.class,
            remaining_before,
            remaining_after: sim.remaining(),
            combo_after: sim.stage.combo(),
            event_count,
            outcome_after: sim.outcome(),
        });
    }
    let status = match (status, sim.outcome()) {
        (Some(status), _) => status,
        (None, Some(outcome)) => RunStatus::from_outcome(outcome),
        (None, None) => RunStatus::MaxSteps,
    };
    log::debug!(
        "autoplay seed {} finished {:?} after {} steps",
        config.seed,
        status,
        steps.len()
    );
    Ok(RunTrace {
        status,
        seed: config.seed,
        stars: sim.stage.stars(),
        gold: sim.stage.gold_collected(),
        remaining: sim.remaining(),
        time_remaining: sim.stage.time_remaining(),
        steps,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeReport {
    pub runs: u32,
    pub cleared: u32,
    pub full_board: u32,
    pub time_out: u32,
    pub stalled: u32,
    pub mean_steps: f64,
    pub mean_stars: f64,
}

impl ProbeReport {
    pub fn clear_rate(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.cleared as f64 / self.runs as f64
    }

    fn record(&mut self, trace: &RunTrace) {
        self.runs += 1;
        match trace.status {
            RunStatus::Cleared => self.cleared += 1,
            RunStatus::FullBoard => self.full_board += 1,
            RunStatus::TimeOut => self.time_out += 1,
            RunStatus::MaxSteps | RunStatus::NoLegalMove => self.stalled += 1,
        }
        let n = self.runs as f64;
        self.mean_steps += (trace.steps.len() as f64 - self.mean_steps) / n;
        self.mean_stars += (trace.stars as f64 - self.mean_stars) / n;
    }
}

/// Runs `runs` seeds starting at `config.seed` and aggregates the outcomes.
pub fn probe(spec: &StageSpec, config: &AutoplayConfig, runs: u32) -> Result<ProbeReport, AutoplayError> {
    let mut report = ProbeReport::default();
    for offset in 0..runs {
        let run_config = AutoplayConfig {
            seed: config.seed.wrapping_add(u64::from(offset)),
            ..config.clone()
        };
        let trace = run_autoplay(spec, &run_config)?;
        report.record(&trace);
    }
    log::info!(
        "probe: {}/{} cleared ({:.1}%)",
        report.cleared,
        report.runs,
        report.clear_rate() * 100.0
    );
    Ok(report)
}
