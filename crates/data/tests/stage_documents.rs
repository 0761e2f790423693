use boxmatch_core::{
    BoardRules, MemoryProgress, ProgressStore, Session, Stage, StageError, StageSource,
};
use boxmatch_data::{load_json, load_stage_spec, DirStageSource, JsonProgressStore};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn assets_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("assets")
}

fn stages_dir() -> PathBuf {
    assets_root().join("stages")
}

fn unique_temp_file(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "boxmatch_{tag}_{}_{}.json",
        std::process::id(),
        nanos
    ))
}

#[test]
fn bundled_stages_load_and_generate() {
    let source = DirStageSource::new(stages_dir());
    assert_eq!(source.stage_count(), 3);
    let specs = source.load_all().expect("load stages");
    for (index, spec) in specs.into_iter().enumerate() {
        let expected = (spec.thing_count + spec.gold_count) as usize;
        let stage = Stage::load(spec, BoardRules::default(), index as u64)
            .unwrap_or_else(|err| panic!("stage {}: {err}", index + 1));
        let boxed: usize = stage
            .boxes()
            .iter()
            .map(|b| b.tokens().filter(|t| !t.is_none()).count())
            .sum();
        let dispensed: usize = stage
            .dispensers()
            .iter()
            .map(|d| d.tokens().filter(|t| !t.is_none()).count())
            .sum();
        assert_eq!(boxed + dispensed, expected, "stage {}", index + 1);
        assert_eq!(stage.remaining(), expected as i64);
        assert!(stage.outcome().is_none());
    }
}

#[test]
fn third_stage_exercises_every_gimmick() {
    let spec = load_stage_spec(stages_dir().join("3.json")).expect("stage 3");
    assert!(spec.hard_mode);
    assert_eq!(spec.gimmick_all(), 9);
    assert_eq!(spec.rails.len(), 1);
    assert!(spec.has_gravity_shelf());
    assert!(spec.boxes.iter().any(|b| b.lock_level > 0));
}

#[test]
fn missing_stage_is_reported_by_index() {
    let source = DirStageSource::new(stages_dir());
    assert_eq!(source.stage(3).unwrap_err(), StageError::MissingStage(3));
}

#[test]
fn inconsistent_document_keeps_its_stage_error() {
    let path = unique_temp_file("bad_stage");
    std::fs::write(
        &path,
        r#"{ "thing_count": 7, "boxes": [ { "index": 0 }, { "index": 1 }, { "index": 2 } ] }"#,
    )
    .expect("write stage");
    let err = load_stage_spec(&path).unwrap_err();
    assert!(format!("{err:#}").contains("not a multiple"));
    assert!(matches!(
        err.downcast_ref::<StageError>(),
        Some(StageError::SpecInconsistent(_))
    ));
    let _ = std::fs::remove_file(path);
}

#[test]
fn unreadable_json_names_the_file() {
    let path = unique_temp_file("garbled");
    std::fs::write(&path, "{ not json").expect("write");
    let err = load_json::<serde_json::Value>(&path).unwrap_err();
    assert!(err.to_string().starts_with("parse "));
    let _ = std::fs::remove_file(path);
}

#[test]
fn progress_round_trips_through_disk() {
    let path = unique_temp_file("progress");
    let mut store = JsonProgressStore::open(&path).expect("open fresh");
    assert_eq!(store.current_stage_index(), 0);
    store.record_clear().expect("clear");
    store.record_clear().expect("clear");
    store.record_fail().expect("fail");
    store.record_clear().expect("clear");

    let reopened = JsonProgressStore::open(&path).expect("reopen");
    assert_eq!(
        reopened.state(),
        &MemoryProgress {
            stage_index: 3,
            streak: 1,
            clears: 3,
        }
    );
    let _ = std::fs::remove_file(path);
}

#[test]
fn progress_with_unknown_version_is_rejected() {
    let path = unique_temp_file("progress_version");
    std::fs::write(&path, r#"{ "version": 9, "stage_index": 4 }"#).expect("write");
    let err = JsonProgressStore::open(&path).unwrap_err();
    assert!(err.to_string().contains("unsupported progress version 9"));
    let _ = std::fs::remove_file(path);
}

#[test]
fn session_plays_bundled_tutorial_from_disk() {
    let path = unique_temp_file("session");
    let store = JsonProgressStore::open(&path).expect("open");
    let mut session = Session::new(DirStageSource::new(stages_dir()), store, BoardRules::instant());
    let stage = session.load_current().expect("tutorial");
    assert_eq!(stage.boxes().len(), 3);
    assert!(stage.spec().preset.is_some());
    assert_eq!(stage.remaining(), 6);
    let _ = std::fs::remove_file(path);
}

#[test]
fn failed_progress_write_keeps_previous_state() {
    let dir = unique_temp_file("no_such_dir");
    let mut store = JsonProgressStore::open(dir.join("progress.json")).expect("open fresh");
    let err = store.record_clear().unwrap_err();
    assert!(matches!(err, StageError::Storage(_)), "{err:?}");
    assert_eq!(store.state(), &MemoryProgress::default());
    assert_eq!(store.current_stage_index(), 0);
    assert!(!dir.exists());

    store.record_fail().unwrap_err();
    assert_eq!(store.streak(), 0);
}
