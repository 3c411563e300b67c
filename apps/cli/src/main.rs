use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use syllabus_core::{
    ChatCompletionsGenerator, CheckpointHandle, CheckpointWriter, Config, CurriculumPipeline,
    JsonDirCorpus, JsonFileStore, ProgressSink, Provider, RepairEngine, RepairPhases,
    SynthesisRequest, WordTimestamp, align, format_curriculum_readable,
};
use tracing_subscriber::EnvFilter;

use crate::render::{create_spinner, print_outcome, render_progress};

mod render;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Phase {
    Expansion,
    Enrichment,
    #[default]
    All,
}

impl From<Phase> for RepairPhases {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Expansion => RepairPhases::expansion(),
            Phase::Enrichment => RepairPhases::enrichment(),
            Phase::All => RepairPhases::all(),
        }
    }
}

#[derive(Parser)]
#[command(name = "syllabus")]
#[command(about = "Turn transcribed video corpora into timestamp-cited training curricula")]
struct Cli {
    /// TOML file overriding the default tuning
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a curriculum from a corpus directory
    Generate {
        /// Directory with one VideoContext JSON document per video
        #[arg(long)]
        corpus: PathBuf,

        /// Checkpoint directory (defaults to the user data dir)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Curriculum id to write; generated when omitted
        #[arg(long)]
        id: Option<String>,

        /// Curriculum title; generated when omitted
        #[arg(long)]
        title: Option<String>,

        /// AI provider for generation; overrides the config file
        #[arg(short, long)]
        provider: Option<CliProvider>,
    },
    /// Re-run failed or missing units of a checkpointed curriculum
    Repair {
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        id: String,

        #[arg(long, default_value = "all")]
        phase: Phase,

        #[arg(short, long)]
        provider: Option<CliProvider>,
    },
    /// Recover step timestamps against a word-level timeline
    Align {
        /// JSON array of step texts
        #[arg(long)]
        steps: PathBuf,

        /// JSON array of {word, start, end} records
        #[arg(long)]
        timeline: PathBuf,
    },
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("syllabus")
        .join("curricula")
}

fn start_store(dir: &Path) -> (CheckpointHandle, Arc<JsonFileStore>) {
    let store = Arc::new(JsonFileStore::new(dir));
    let (handle, _writer) = CheckpointWriter::spawn(store.clone());
    (handle, store)
}

fn generator_for(
    provider: Option<CliProvider>,
    config: &Config,
) -> Result<Arc<ChatCompletionsGenerator>> {
    let provider = provider.map_or(config.generation.provider, Provider::from);
    let generator = ChatCompletionsGenerator::new(provider, &config.generation)?;
    Ok(Arc::new(generator))
}

fn print_header(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("syllabus").cyan().bold(),
        style(subtitle).dim()
    );
}

async fn print_saved(handle: &CheckpointHandle, store: &JsonFileStore, id: &str) -> Result<()> {
    let curriculum = handle
        .load(id)
        .await?
        .with_context(|| format!("curriculum {id} was not saved"))?;

    println!(
        "\n{} {}\n",
        style("Saved:").dim(),
        style(store.path_for(id).display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_curriculum_readable(&curriculum));
    Ok(())
}

async fn generate(
    config: Config,
    corpus: PathBuf,
    store_dir: PathBuf,
    request: SynthesisRequest,
    provider: Option<CliProvider>,
) -> Result<()> {
    let generator = generator_for(provider, &config)?;
    let (checkpoints, store) = start_store(&store_dir);
    let pipeline = CurriculumPipeline::new(
        generator,
        Arc::new(JsonDirCorpus::new(corpus)),
        checkpoints.clone(),
        config,
    );

    print_header("Curriculum Synthesis");
    let started = Instant::now();
    let (progress, events) = ProgressSink::channel();
    let spinner = create_spinner("Loading corpus...");
    let renderer = render_progress(events, spinner.clone());

    let outcome = pipeline.run(&request, &progress).await;
    drop(progress);
    let _ = renderer.await;
    spinner.finish_and_clear();

    let outcome = outcome?;
    print_outcome(&outcome, started.elapsed());
    print_saved(&checkpoints, &store, &outcome.curriculum_id).await
}

async fn repair(
    config: Config,
    corpus: PathBuf,
    store_dir: PathBuf,
    id: String,
    phases: RepairPhases,
    provider: Option<CliProvider>,
) -> Result<()> {
    let generator = generator_for(provider, &config)?;
    let (checkpoints, store) = start_store(&store_dir);
    let engine = RepairEngine::new(
        generator,
        Arc::new(JsonDirCorpus::new(corpus)),
        checkpoints.clone(),
        config,
    );

    print_header("Curriculum Repair");
    let started = Instant::now();
    let (progress, events) = ProgressSink::channel();
    let spinner = create_spinner(&format!("Loading {id}..."));
    let renderer = render_progress(events, spinner.clone());

    let outcome = engine.repair(&id, phases, &progress).await;
    drop(progress);
    let _ = renderer.await;
    spinner.finish_and_clear();

    let outcome = outcome?;
    print_outcome(&outcome, started.elapsed());
    print_saved(&checkpoints, &store, &id).await
}

fn align_command(config: &Config, steps: &Path, timeline: &Path) -> Result<()> {
    let steps: Vec<String> = serde_json::from_str(
        &std::fs::read_to_string(steps).with_context(|| format!("reading {}", steps.display()))?,
    )
    .context("steps must be a JSON array of strings")?;
    let timeline: Vec<WordTimestamp> = serde_json::from_str(
        &std::fs::read_to_string(timeline)
            .with_context(|| format!("reading {}", timeline.display()))?,
    )
    .context("timeline must be a JSON array of {word, start, end}")?;

    let segments = align(&steps, &timeline, &config.aligner);
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate {
            corpus,
            store,
            id,
            title,
            provider,
        } => {
            let request = SynthesisRequest {
                curriculum_id: id,
                title,
            };
            let store = store.unwrap_or_else(default_store_dir);
            generate(config, corpus, store, request, provider).await
        }
        Command::Repair {
            corpus,
            store,
            id,
            phase,
            provider,
        } => {
            let store = store.unwrap_or_else(default_store_dir);
            repair(config, corpus, store, id, phase.into(), provider).await
        }
        Command::Align { steps, timeline } => align_command(&config, &steps, &timeline),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
