use anyhow::{bail, Context};
use boxmatch_core::{MemoryProgress, ProgressStore, StageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PROGRESS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedProgress {
    version: u32,
    stage_index: u32,
    #[serde(default)]
    streak: u32,
    #[serde(default)]
    clears: u32,
}

pub fn default_progress_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("BOXMATCH_PROGRESS") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".boxmatch_progress.json"))
}

/// Progress kept in a versioned JSON file, rewritten on every stage boundary.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
    state: MemoryProgress,
}

impl JsonProgressStore {
    /// Opens `path`, starting fresh when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            read_progress(&path)?
        } else {
            MemoryProgress::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &MemoryProgress {
        &self.state
    }

    pub fn save(&self) -> anyhow::Result<()> {
        write_progress(&self.path, &self.state)
    }

    /// Writes `next` and adopts it only once the file holds it.
    fn commit(&mut self, next: MemoryProgress) -> Result<(), StageError> {
        write_progress(&self.path, &next).map_err(|err| StageError::Storage(format!("{err:#}")))?;
        self.state = next;
        Ok(())
    }
}

fn write_progress(path: &Path, state: &MemoryProgress) -> anyhow::Result<()> {
    let payload = SavedProgress {
        version: PROGRESS_SCHEMA_VERSION,
        stage_index: state.stage_index,
        streak: state.streak,
        clears: state.clears,
    };
    let body = serde_json::to_string_pretty(&payload).context("encode progress")?;
    fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

fn read_progress(path: &Path) -> anyhow::Result<MemoryProgress> {
    let body = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let saved: SavedProgress =
        serde_json::from_str(&body).with_context(|| format!("parse {}", path.display()))?;
    if saved.version != PROGRESS_SCHEMA_VERSION {
        bail!(
            "unsupported progress version {} (expected {})",
            saved.version,
            PROGRESS_SCHEMA_VERSION
        );
    }
    Ok(MemoryProgress {
        stage_index: saved.stage_index,
        streak: saved.streak,
        clears: saved.clears,
    })
}

impl ProgressStore for JsonProgressStore {
    fn current_stage_index(&self) -> u32 {
        self.state.current_stage_index()
    }

    fn streak(&self) -> u32 {
        self.state.streak()
    }

    fn record_clear(&mut self) -> Result<(), StageError> {
        let mut next = self.state.clone();
        next.record_clear()?;
        self.commit(next)
    }

    fn record_fail(&mut self) -> Result<(), StageError> {
        let mut next = self.state.clone();
        next.record_fail()?;
        self.commit(next)
    }
}
