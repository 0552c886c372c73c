//! Roundtable CLI - multi-party AI debates
//!
//! A command-line tool for running structured debates between model-backed
//! (and human) participants on Ollama or any OpenAI-compatible server.

mod chat;
mod console;
mod record;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use roundtable_core::config::{self, Config};
use roundtable_core::{
    CancelHandle, DebateError, DebateFormat, DebateOrchestrator, DebateRequest, DebateResult,
    MetricsStrategy, ParticipantConfig, ParticipantRole, StanceMode, StyleTone, TranscriptEntry,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "roundtable.toml";

#[derive(Parser)]
#[command(
    name = "roundtable",
    version,
    about = "Roundtable - Watch AIs debate topics",
    long_about = "A CLI tool for running multi-party debates between AI participants using Ollama or OpenAI-compatible APIs."
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full debate
    Run(RunArgs),
    /// Run a debate turn by turn, typing human turns on stdin
    Chat(ChatArgs),
    /// Score a saved transcript
    Analyze {
        /// JSON file holding a debate result or a list of transcript entries
        #[arg(value_name = "TRANSCRIPT")]
        path: PathBuf,

        /// Topic of the debate (defaults to the one stored in the result)
        #[arg(long)]
        topic: Option<String>,

        /// Metrics strategy override
        #[arg(long, value_enum)]
        metrics: Option<MetricsChoice>,
    },
    /// List the models the backend can serve
    Models,
    /// Check that the backend is reachable
    Health,
    /// List the stance modes and style tones usable in participant specs
    Styles,
}

#[derive(Args)]
struct RunArgs {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Debate format: one-to-one, cross-exam, many-on-one, panel, round-robin
    #[arg(short, long, default_value = "one-to-one", value_name = "FORMAT", value_parser = parse_format)]
    format: DebateFormat,

    /// Participant as LABEL=MODEL[:STANCE[:TONE]]; MODEL "user" means a human,
    /// an empty MODEL means the configured default model.
    /// Roles follow position: cross-exam is examiner then examinee, many-on-one
    /// is examinee then examiners, panel is moderator then panelists.
    #[arg(short, long = "participant", action = ArgAction::Append, value_name = "SPEC", required = true)]
    participants: Vec<String>,

    /// Number of debate rounds
    #[arg(short, long, default_value = "3", value_name = "ROUNDS")]
    rounds: u32,

    /// Intensity 1-10 (defaults to the configured value)
    #[arg(short, long, value_name = "LEVEL")]
    intensity: Option<u8>,

    /// Metrics strategy override
    #[arg(long, value_enum)]
    metrics: Option<MetricsChoice>,

    /// Write the result as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write a markdown record into this directory
    #[arg(long, value_name = "DIR")]
    record_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ChatArgs {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Participant as LABEL=MODEL[:STANCE[:TONE]]; MODEL "user" means you.
    #[arg(short, long = "participant", action = ArgAction::Append, value_name = "SPEC", required = true)]
    participants: Vec<String>,

    /// Assign roles by this format's positions
    #[arg(short, long, value_name = "FORMAT", value_parser = parse_format)]
    format: Option<DebateFormat>,

    #[arg(short, long, default_value = "3", value_name = "ROUNDS")]
    rounds: u32,

    #[arg(short, long, value_name = "LEVEL")]
    intensity: Option<u8>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricsChoice {
    Heuristic,
    Delegated,
}

impl From<MetricsChoice> for MetricsStrategy {
    fn from(choice: MetricsChoice) -> Self {
        match choice {
            MetricsChoice::Heuristic => MetricsStrategy::Heuristic,
            MetricsChoice::Delegated => MetricsStrategy::Delegated,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?.with_env_overrides();

    match cli.command {
        Command::Run(args) => {
            if let Some(metrics) = args.metrics {
                config.debate.metrics = metrics.into();
            }
            run(&config, args).await
        }
        Command::Chat(args) => chat(&config, args).await,
        Command::Analyze {
            path,
            topic,
            metrics,
        } => {
            if let Some(metrics) = metrics {
                config.debate.metrics = metrics.into();
            }
            analyze(&config, &path, topic).await
        }
        Command::Models => {
            let orchestrator = DebateOrchestrator::from_config(&config)?;
            let models = orchestrator.list_models().await?;
            println!("{}", format!("Models at {}:", config.generator.url).bold());
            for model in models {
                println!("  {}", model);
            }
            Ok(())
        }
        Command::Styles => {
            console::print_styles();
            Ok(())
        }
        Command::Health => {
            let orchestrator = DebateOrchestrator::from_config(&config)?;
            if orchestrator.is_healthy().await {
                println!("{} {}", "✔".bright_green(), config.generator.url);
                Ok(())
            } else {
                eprintln!(
                    "{} Backend at {} is not reachable.",
                    "Error:".red().bold(),
                    config.generator.url
                );
                std::process::exit(1);
            }
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&Path>) -> Result<Config, DebateError> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(DEFAULT_CONFIG_FILE),
        None => Ok(config::default_config()),
    }
}

/// Wire Ctrl-C to a cancel handle.
fn cancel_on_ctrl_c() -> CancelHandle {
    let cancel = CancelHandle::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                "Stopping after the current turn (Ctrl-C)...".yellow()
            );
            handle.cancel();
        }
    });
    cancel
}

async fn run(config: &Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let participants = parse_participants(&args.participants, &config.generator.default_model)?;
    let participants = args.format.assign_roles(participants);
    let intensity = args.intensity.unwrap_or(config.debate.default_intensity);

    console::print_header(args.format.display_name(), &args.topic, &participants);

    let orchestrator = DebateOrchestrator::from_config(config)?
        .with_callback(console::create_console_callback());
    let request = DebateRequest::new(&args.topic, args.format, participants)
        .with_rounds(args.rounds)
        .with_intensity(intensity)
        .with_cancel(cancel_on_ctrl_c());

    let result = match orchestrator.run_debate(request).await {
        Ok(result) => result,
        Err(DebateError::InvalidConfiguration(reason)) => {
            eprintln!("{} {}", "Error:".red().bold(), reason);
            eprintln!("Available formats: {}", console::format_names());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    console::print_summary(&result);
    save_outputs(&result, intensity, args.json.as_deref(), args.record_dir.as_deref())?;
    Ok(())
}

fn save_outputs(
    result: &DebateResult,
    intensity: u8,
    json: Option<&Path>,
    record_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = json {
        fs::write(path, serde_json::to_string_pretty(result)?)?;
        info!("Wrote result to {}", path.display());
    }
    if let Some(dir) = record_dir {
        let path = record::write_record(dir, result, intensity)?;
        println!("{} {}", "Record saved:".bold(), path.display());
    }
    Ok(())
}

async fn chat(config: &Config, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let participants = parse_participants(&args.participants, &config.generator.default_model)?;
    let participants = match args.format {
        Some(format) => format.assign_roles(participants),
        None => participants,
    };
    let title = args
        .format
        .map(|f| f.display_name())
        .unwrap_or("Interactive Debate");
    console::print_header(title, &args.topic, &participants);

    let orchestrator = DebateOrchestrator::from_config(config)?;
    if let Err(reason) = check_rounds(args.rounds, orchestrator.config().max_rounds_limit) {
        eprintln!("{} {}", "Error:".red().bold(), reason);
        std::process::exit(1);
    }
    let session = chat::ChatSession {
        topic: args.topic,
        format: args.format,
        participants,
        rounds: args.rounds,
        intensity: args.intensity.unwrap_or(config.debate.default_intensity),
    };
    chat::run_chat(&orchestrator, session, cancel_on_ctrl_c()).await?;
    Ok(())
}

async fn analyze(
    config: &Config,
    path: &Path,
    topic: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    let (stored_topic, entries) = match serde_json::from_str::<DebateResult>(&raw) {
        Ok(result) => (Some(result.topic), result.transcript),
        Err(_) => (None, serde_json::from_str::<Vec<TranscriptEntry>>(&raw)?),
    };
    let Some(topic) = topic.or(stored_topic) else {
        return Err("no topic stored in the file; pass --topic".into());
    };
    let round = entries.iter().map(|e| e.round).max().unwrap_or(0);

    let orchestrator = DebateOrchestrator::from_config(config)?;
    let analysis = orchestrator.analyze(&topic, &entries, round).await;
    if !analysis.success {
        warn!("Analysis did not succeed");
    }
    console::print_metrics(&analysis.metrics, analysis.success, analysis.error.as_deref());
    Ok(())
}

fn check_rounds(rounds: u32, limit: u32) -> Result<(), String> {
    if (1..=limit).contains(&rounds) {
        Ok(())
    } else {
        Err(format!("--rounds must be between 1 and {}, got {}", limit, rounds))
    }
}

fn parse_format(name: &str) -> Result<DebateFormat, String> {
    name.parse::<DebateFormat>()
        .map_err(|e| format!("{} (expected one of: {})", e, console::format_names()))
}

fn parse_participants(
    specs: &[String],
    default_model: &str,
) -> Result<Vec<ParticipantConfig>, String> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| parse_participant(spec, i, default_model))
        .collect()
}

/// Parse `LABEL=MODEL[:STANCE[:TONE]]`.
///
/// Model names may themselves contain colons (`gemma3:27b`), so trailing
/// segments only count as stance and tone when they parse as such. An empty
/// MODEL (`Ada=` or `Ada=:invert`) falls back to `default_model`.
fn parse_participant(
    spec: &str,
    index: usize,
    default_model: &str,
) -> Result<ParticipantConfig, String> {
    let (label, rest) = match spec.split_once('=') {
        Some((label, rest)) => (label.trim().to_string(), rest),
        None => (format!("Participant {}", index + 1), spec),
    };
    if label.is_empty() {
        return Err(format!("participant '{}' has an empty label", spec));
    }

    let mut parts: Vec<&str> = rest.split(':').collect();
    let mut stance = StanceMode::Echo;
    let mut tone = StyleTone::Neutral;

    let n = parts.len();
    let both = if n >= 3 {
        match (parts[n - 2].parse::<StanceMode>(), parts[n - 1].parse::<StyleTone>()) {
            (Ok(s), Ok(t)) => Some((s, t)),
            _ => None,
        }
    } else {
        None
    };
    if let Some((s, t)) = both {
        stance = s;
        tone = t;
        parts.truncate(n - 2);
    } else if n >= 2 {
        if let Ok(s) = parts[n - 1].parse::<StanceMode>() {
            stance = s;
            parts.truncate(n - 1);
        }
    }

    let model = parts.join(":");
    let model = match model.trim() {
        "" => default_model.trim(),
        named => named,
    };
    if model.is_empty() {
        return Err(format!("participant '{}' has no model", spec));
    }

    Ok(ParticipantConfig::new(label, model, ParticipantRole::Debater)
        .with_stance(stance)
        .with_tone(tone))
}
