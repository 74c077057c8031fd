//! Earlysign: autism risk screening with longitudinal tracking.
//!
//! Main entry point for the command-line application.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use earlysign::adapters::chart::SvgTrendRenderer;
use earlysign::adapters::sanitize::SanitizingMakeWriter;
use earlysign::adapters::sqlite::SqliteHistoryStore;
use earlysign::config::{Settings, SettingsArgs};
use earlysign::domain::{parse_date, RawAnswers};
use earlysign::{EarlysignError, RiskPredictor, ScoringService};

#[derive(Parser)]
#[command(name = "earlysign")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Machine-readable output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one answer set and append it to the subject's history
    Score {
        /// Subject identifier
        #[arg(long)]
        subject: String,
        /// JSON answers file, or `-` for stdin
        #[arg(long)]
        answers: PathBuf,
        /// Screening date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print a subject's recorded scores
    History {
        /// Subject identifier
        subject: String,
    },
    /// Write a subject's trend chart
    Trend {
        /// Subject identifier
        subject: String,
    },
    /// List subjects with at least one record
    Subjects,
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // stdout carries command output, so logs go to stderr or a file.
    // Default: stderr when attached to a terminal, file otherwise.
    let log_mode = std::env::var("EARLYSIGN_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let use_file = match log_mode.as_str() {
        "file" => true,
        "stderr" => false,
        // auto
        _ => !std::io::stderr().is_terminal(),
    };

    let (writer, guard) = if use_file {
        let log_file =
            std::env::var("EARLYSIGN_LOG_FILE").unwrap_or_else(|_| "earlysign.log".to_string());

        if let Some(parent) = Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_answers(path: &Path) -> Result<RawAnswers> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read answers from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers file {}", path.display()))?
    };
    let answers = serde_json::from_str(&text).context("Answers must be a JSON object")?;
    Ok(answers)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli, settings: &Settings, service: &ScoringService<SqliteHistoryStore>) -> Result<()> {
    match cli.command {
        Commands::Score {
            subject,
            answers,
            date,
        } => {
            let raw = read_answers(&answers)?;
            let assessment = match date {
                Some(d) => {
                    let date = parse_date(&d)
                        .with_context(|| format!("Invalid --date {d:?}, expected YYYY-MM-DD"))?;
                    service.score(&subject, &raw, date)?
                }
                None => service.score_today(&subject, &raw)?,
            };

            if cli.json {
                print_json(&json!({
                    "risk_score": assessment.score.rounded(),
                    "risk_level": assessment.tier.label(),
                    "date": assessment.date,
                    "record_id": assessment.record_id,
                }))?;
            } else {
                println!("Risk score: {}", assessment.score);
                println!("Risk level: {}", assessment.tier);
                println!("{}", assessment.tier.description());
            }
        }
        Commands::History { subject } => {
            let records = service.history(&subject)?;
            if cli.json {
                print_json(&json!(records
                    .iter()
                    .map(|r| json!({ "date": r.date, "risk": r.score.value() }))
                    .collect::<Vec<_>>()))?;
            } else if records.is_empty() {
                println!("No history for {subject}");
            } else {
                for record in &records {
                    println!("{}  {}  {}", record.date, record.score, record.score.tier());
                }
            }
        }
        Commands::Trend { subject } => {
            let renderer = SvgTrendRenderer::new(&settings.chart_dir);
            match service.render_trend(&subject, &renderer) {
                Ok(path) => {
                    if cli.json {
                        print_json(&json!({ "chart": path }))?;
                    } else {
                        println!("Chart written to {}", path.display());
                    }
                }
                Err(EarlysignError::NoHistory(_)) => {
                    if cli.json {
                        print_json(&json!({ "chart": null }))?;
                    } else {
                        println!("No history for {subject}");
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Subjects => {
            let subjects = service.subjects()?;
            if cli.json {
                print_json(&json!(subjects))?;
            } else {
                for subject in subjects {
                    println!("{subject}");
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let settings = Settings::try_from(cli.settings.clone()).context("Invalid configuration")?;

    tracing::info!("Starting Earlysign...");

    let predictor = RiskPredictor::load(&settings.model_path, &settings.model_loader())
        .context("Failed to load screening model")?;
    let store = Arc::new(
        SqliteHistoryStore::new(&settings.db_path)
            .with_context(|| format!("Failed to open history database {:?}", settings.db_path))?,
    );
    let service = ScoringService::new(predictor, store).with_history_order(settings.history_order);

    run(cli, &settings, &service)
}
