mod render;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use wisestudy_contracts::analysis::response_schema;
use wisestudy_contracts::events::EventWriter;
use wisestudy_contracts::models::{choose_model, KNOWN_MODELS};
use wisestudy_contracts::state::AppState;
use wisestudy_contracts::upload::{check_media_type, media_type_for_path, UploadedFile};
use wisestudy_engine::{normalize_upload, AnalysisClient, AnalysisSession, ClientConfig};

use crate::render::render_report;

const EXIT_ANALYSIS_FAILED: i32 = 1;
const EXIT_UPLOAD_REJECTED: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "wisestudy",
    version,
    about = "Exam paper diagnosis: score estimate, weak topics, study plan"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one exam photo or PDF.
    Analyze(AnalyzeArgs),
    /// Run only the image normalizer and write the payload that would be sent.
    Normalize(NormalizeArgs),
    /// Print the response schema sent to the AI service.
    Schema,
    /// List known analysis models.
    Models,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
    /// Request timeout in seconds (15-300).
    #[arg(long, default_value_t = 90.0)]
    timeout: f64,
    /// Append session events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Print the result as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct NormalizeArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("wisestudy error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Normalize(args) => run_normalize(args),
        Command::Schema => {
            print_json(&response_schema())?;
            Ok(0)
        }
        Command::Models => {
            for model in KNOWN_MODELS {
                println!("{:<20} {}", model.name, model.label);
            }
            Ok(0)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let choice = choose_model(args.model.as_deref());
    if let Some(reason) = choice.fallback_reason.as_deref() {
        tracing::warn!("{reason}");
    }

    let mut config = ClientConfig::from_env()
        .with_model(choice.model.name)
        .with_timeout_secs(args.timeout);
    if let Some(api_base) = args.api_base.as_deref() {
        config = config.with_api_base(api_base);
    }
    let client = AnalysisClient::new(config).context("failed to build HTTP client")?;

    let mut session = AnalysisSession::new(client);
    if let Some(path) = args.events.as_ref() {
        session = session.with_events(EventWriter::new(path, uuid::Uuid::new_v4().to_string()));
    }

    let state = match session.submit_path(&args.file) {
        Ok(state) => state,
        Err(rejection) => {
            eprintln!("{}", rejection.user_message());
            return Ok(EXIT_UPLOAD_REJECTED);
        }
    };

    match state {
        AppState::Success(result) => {
            if args.json {
                print_json(&serde_json::to_value(&**result)?)?;
            } else {
                print!("{}", render_report(result));
            }
            Ok(0)
        }
        AppState::Error(message) => {
            eprintln!("{message}");
            Ok(EXIT_ANALYSIS_FAILED)
        }
        other => bail!("analysis ended in unexpected state '{}'", other.name()),
    }
}

fn run_normalize(args: NormalizeArgs) -> Result<i32> {
    let media_type = media_type_for_path(&args.file);
    if let Err(rejection) = check_media_type(media_type) {
        eprintln!("{}", rejection.user_message());
        return Ok(EXIT_UPLOAD_REJECTED);
    }
    let bytes =
        fs::read(&args.file).with_context(|| format!("failed reading {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default();
    let original_bytes = bytes.len();
    let payload = normalize_upload(&UploadedFile::new(name, media_type, bytes));

    let decoded = payload.decode()?;
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&args.out, &decoded)
        .with_context(|| format!("failed writing {}", args.out.display()))?;

    print_json(&json!({
        "outcome": payload.outcome.as_str(),
        "mime_type": payload.mime_type,
        "width": payload.dimensions.map(|(width, _)| width),
        "height": payload.dimensions.map(|(_, height)| height),
        "original_bytes": original_bytes,
        "payload_bytes": decoded.len(),
        "out": args.out.display().to_string(),
    }))?;
    Ok(0)
}

fn print_json(value: &Value) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}
