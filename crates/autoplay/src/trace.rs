use crate::{AutoMove, AutoplayError, MoveClass};
use boxmatch_core::{FailReason, StageOutcome};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStatus {
    Cleared,
    FullBoard,
    TimeOut,
    MaxSteps,
    NoLegalMove,
}

impl RunStatus {
    pub fn from_outcome(outcome: StageOutcome) -> Self {
        match outcome {
            StageOutcome::Clear => Self::Cleared,
            StageOutcome::Failed(FailReason::FullBoard) => Self::FullBoard,
            StageOutcome::Failed(FailReason::TimeOut) => Self::TimeOut,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    pub action: AutoMove,
    pub class: MoveClass,
    pub remaining_before: i64,
    pub remaining_after: i64,
    pub combo_after: u32,
    pub event_count: usize,
    #[serde(default)]
    pub outcome_after: Option<StageOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub status: RunStatus,
    pub seed: u64,
    pub stars: u32,
    pub gold: u32,
    pub remaining: i64,
    pub time_remaining: u32,
    pub steps: Vec<StepRecord>,
}

impl RunTrace {
    pub fn cleared(&self) -> bool {
        self.status == RunStatus::Cleared
    }

    pub fn to_text_report(&self) -> String {
        let mut lines = vec![
            format!("status: {}", run_status_label(self.status)),
            format!(
                "final: seed={} stars={} gold={} remaining={} time_left={}s",
                self.seed, self.stars, self.gold, self.remaining, self.time_remaining
            ),
            format!("steps: {}", self.steps.len()),
            String::new(),
        ];
        for step in &self.steps {
            lines.push(format!(
                "  step {:>4} | {:<8} | {}",
                step.step,
                class_label(step.class),
                step.action.short_label()
            ));
            lines.push(format!(
                "    remaining {} -> {} combo {} events {}",
                step.remaining_before, step.remaining_after, step.combo_after, step.event_count
            ));
            if let Some(outcome) = step.outcome_after {
                lines.push(format!("    outcome: {outcome:?}"));
            }
        }
        lines.join("\n")
    }
}

fn class_label(class: MoveClass) -> &'static str {
    match class {
        MoveClass::Triplet => "triplet",
        MoveClass::Gold => "gold",
        MoveClass::Pair => "pair",
        MoveClass::Plain => "plain",
    }
}

fn run_status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Cleared => "Cleared",
        RunStatus::FullBoard => "Failed (full board)",
        RunStatus::TimeOut => "Failed (time out)",
        RunStatus::MaxSteps => "MaxSteps",
        RunStatus::NoLegalMove => "NoLegalMove",
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AutoplayError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body)?;
    Ok(())
}

pub fn write_text(path: &Path, trace: &RunTrace) -> Result<(), AutoplayError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, trace.to_text_report())?;
    Ok(())
}
