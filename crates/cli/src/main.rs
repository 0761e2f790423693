//! Command-line inspector for stage documents.
//!
//! Usage:
//!   boxmatch generate --stage 3 --seed 7   - Print the generated layout
//!   boxmatch check assets/stages/*.json    - Validate stage documents
//!   boxmatch autoplay --stage 3 --runs 50  - Probe difficulty with the greedy player
//!   boxmatch progress                      - Show saved progress

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use boxmatch_autoplay::{probe, run_autoplay, write_json, write_text, AutoplayConfig};
use boxmatch_core::{BoardRules, ProgressStore, Stage, StageSource, StageSpec, Token, MAX_STAGE};
use boxmatch_data::{default_progress_path, load_stage_spec, DirStageSource, JsonProgressStore};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "boxmatch", about = "Box-match stage tools")]
struct Cli {
    /// Directory holding `1.json`, `2.json`, ...
    #[arg(long, global = true, default_value = "assets/stages")]
    stages: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StageArg {
    /// One-based stage number inside the stages directory
    #[arg(short, long, default_value_t = 1)]
    stage: u32,
    /// Stage document to use instead of the stages directory
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated layout of a stage
    Generate {
        #[command(flatten)]
        stage: StageArg,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate stage documents
    Check {
        /// Documents to check; defaults to every stage in the stages directory
        files: Vec<PathBuf>,
    },
    /// Play a stage with the greedy autoplayer
    Autoplay {
        #[command(flatten)]
        stage: StageArg,
        #[arg(long, default_value_t = 0xC0FFEE)]
        seed: u64,
        /// Number of seeds to probe
        #[arg(short, long, default_value_t = 1)]
        runs: u32,
        #[arg(long, default_value_t = 600)]
        max_steps: u32,
        /// Write the single-run trace as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Write the single-run text report
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show saved progress
    Progress {
        /// Progress file; defaults to $BOXMATCH_PROGRESS or ~/.boxmatch_progress.json
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { stage, seed, json } => generate(&cli.stages, &stage, seed, json),
        Commands::Check { files } => check(&cli.stages, files),
        Commands::Autoplay {
            stage,
            seed,
            runs,
            max_steps,
            trace,
            report,
        } => autoplay(
            &cli.stages,
            &stage,
            seed,
            runs,
            max_steps,
            trace.as_deref(),
            report.as_deref(),
        ),
        Commands::Progress { file } => progress(file),
    }
}

fn resolve_spec(stages: &Path, arg: &StageArg) -> Result<StageSpec> {
    if let Some(file) = &arg.file {
        return load_stage_spec(file);
    }
    if arg.stage == 0 {
        bail!("stage numbers start at 1");
    }
    let index = arg.stage - 1;
    let mut spec = DirStageSource::new(stages)
        .stage(index)
        .with_context(|| format!("load stage {} from {}", arg.stage, stages.display()))?;
    if index == 0 && spec.preset.is_none() {
        spec.apply_tutorial();
    }
    Ok(spec)
}

#[derive(Serialize)]
struct BoxView {
    index: u32,
    lock: u8,
    gravity: bool,
    window: Vec<Token>,
    queue: Vec<Token>,
}

#[derive(Serialize)]
struct DispenserView {
    index: u32,
    next_queue: bool,
    batch: Vec<Token>,
    queued: usize,
}

#[derive(Serialize)]
struct LayoutView {
    seed: u64,
    remaining: i64,
    boxes: Vec<BoxView>,
    dispensers: Vec<DispenserView>,
}

fn layout_view(stage: &Stage) -> LayoutView {
    LayoutView {
        seed: stage.seed(),
        remaining: stage.remaining(),
        boxes: stage
            .boxes()
            .iter()
            .map(|b| BoxView {
                index: b.index(),
                lock: b.lock(),
                gravity: b.gravity(),
                window: b.slots().to_vec(),
                queue: b.tokens().skip(b.slots().len()).copied().collect(),
            })
            .collect(),
        dispensers: stage
            .dispensers()
            .iter()
            .map(|d| DispenserView {
                index: d.key().index,
                next_queue: d.is_next_queue(),
                batch: d.slots().to_vec(),
                queued: d.queue_len(),
            })
            .collect(),
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn generate(stages: &Path, arg: &StageArg, seed: u64, json: bool) -> Result<()> {
    let spec = resolve_spec(stages, arg)?;
    let stage = Stage::load(spec, BoardRules::default(), seed).context("generate layout")?;
    let view = layout_view(&stage);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    println!("seed {} | remaining {}", view.seed, view.remaining);
    for b in &view.boxes {
        let mut tags = String::new();
        if b.lock > 0 {
            tags.push_str(&format!(" lock={}", b.lock));
        }
        if b.gravity {
            tags.push_str(" gravity");
        }
        println!(
            "box {:>2}{tags}: [{}] | {}",
            b.index,
            join_tokens(&b.window),
            join_tokens(&b.queue)
        );
    }
    for d in &view.dispensers {
        println!(
            "dispenser {:>2}{}: [{}] +{} queued",
            d.index,
            if d.next_queue { " next" } else { "" },
            join_tokens(&d.batch),
            d.queued
        );
    }
    Ok(())
}

fn check(stages: &Path, files: Vec<PathBuf>) -> Result<()> {
    let files = if files.is_empty() {
        let source = DirStageSource::new(stages);
        (0..source.stage_count())
            .map(|index| source.stage_path(index))
            .collect()
    } else {
        files
    };
    if files.is_empty() {
        bail!("no stage documents under {}", stages.display());
    }
    let mut failed = 0;
    for file in &files {
        match load_stage_spec(file) {
            Ok(spec) => println!(
                "ok    {} ({} boxes, {} tokens)",
                file.display(),
                spec.box_count(),
                spec.total_tokens()
            ),
            Err(err) => {
                failed += 1;
                println!("FAIL  {}: {err:#}", file.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} stage documents failed", files.len());
    }
    Ok(())
}

fn autoplay(
    stages: &Path,
    arg: &StageArg,
    seed: u64,
    runs: u32,
    max_steps: u32,
    trace_path: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let spec = resolve_spec(stages, arg)?;
    let config = AutoplayConfig {
        seed,
        max_steps,
        ..AutoplayConfig::default()
    };
    if runs <= 1 {
        let trace = run_autoplay(&spec, &config)?;
        println!("{}", trace.to_text_report());
        if let Some(path) = trace_path {
            write_json(path, &trace)?;
            log::info!("trace written to {}", path.display());
        }
        if let Some(path) = report_path {
            write_text(path, &trace)?;
            log::info!("report written to {}", path.display());
        }
        return Ok(());
    }
    let report = probe(&spec, &config, runs)?;
    println!(
        "runs {} | cleared {} ({:.1}%) | full board {} | time out {} | stalled {}",
        report.runs,
        report.cleared,
        report.clear_rate() * 100.0,
        report.full_board,
        report.time_out,
        report.stalled
    );
    println!(
        "mean steps {:.1} | mean stars {:.1}",
        report.mean_steps, report.mean_stars
    );
    Ok(())
}

fn progress(file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => default_progress_path()
            .context("no progress path; set BOXMATCH_PROGRESS or HOME")?,
    };
    let store = JsonProgressStore::open(&path)?;
    let state = store.state();
    println!("file {}", store.path().display());
    println!(
        "stage {}/{} | streak {} | clears {}",
        store.current_stage_index() + 1,
        MAX_STAGE,
        store.streak(),
        state.clears
    );
    Ok(())
}
