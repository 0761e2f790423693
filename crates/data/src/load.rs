use anyhow::Context;
use boxmatch_core::{StageError, StageSource, StageSpec};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub const STAGE_FILE_EXT: &str = "json";

pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}

/// Reads one stage document and checks that its counts reconcile.
pub fn load_stage_spec(path: impl AsRef<Path>) -> anyhow::Result<StageSpec> {
    let path = path.as_ref();
    let spec: StageSpec = load_json(path)?;
    spec.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(spec)
}

/// Stage documents named `1.json`, `2.json`, ... for stage indices 0, 1, ...
#[derive(Debug, Clone)]
pub struct DirStageSource {
    root: PathBuf,
}

impl DirStageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_path(&self, index: u32) -> PathBuf {
        self.root.join(format!("{}.{STAGE_FILE_EXT}", index + 1))
    }

    /// Number of consecutive stage documents starting at `1.json`.
    pub fn stage_count(&self) -> u32 {
        let mut count = 0;
        while self.stage_path(count).is_file() {
            count += 1;
        }
        count
    }

    /// Loads every consecutive document, stopping at the first gap.
    pub fn load_all(&self) -> anyhow::Result<Vec<StageSpec>> {
        (0..self.stage_count())
            .map(|index| load_stage_spec(self.stage_path(index)))
            .collect()
    }
}

impl StageSource for DirStageSource {
    fn stage(&self, index: u32) -> Result<StageSpec, StageError> {
        let path = self.stage_path(index);
        if !path.is_file() {
            return Err(StageError::MissingStage(index));
        }
        load_stage_spec(&path).map_err(|err| {
            log::warn!("stage {} unusable: {err:#}", index + 1);
            match err.downcast::<StageError>() {
                Ok(stage_err) => stage_err,
                Err(err) => StageError::Storage(format!("{err:#}")),
            }
        })
    }
}
