//! `almanac`: ask about the weather at one fixed location.
//!
//! Past days are answered from the local historical store, which is
//! bootstrapped on first use and topped up before each historical answer.
//! Upcoming days are answered from the live forecast.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use almanac_engine::{
    resolve_phrase, Almanac, AlmanacConfig, Answer, HistoricalStore, OpenMeteoClient,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::load_config;

/// Fixed-location weather almanac
#[derive(Parser)]
#[command(name = "almanac", version, about = "Ask about past and upcoming weather")]
struct Cli {
    /// TOML config file (defaults to ./almanac.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question, e.g. `almanac ask what was it like last monday`.
    Ask {
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,

        /// Anchor date instead of the current UTC date.
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Print `{"response": ...}` instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Answer one question per line read from stdin.
    Chat {
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show which date a phrase resolves to, without fetching anything.
    Resolve {
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,

        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Create the historical store, or rebuild it with `--force`.
    Bootstrap {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct JsonResponse<'a> {
    response: &'a str,
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Utc::now().date_naive())
}

async fn open_almanac(config: AlmanacConfig, today: NaiveDate) -> Result<Almanac<OpenMeteoClient>> {
    let client = OpenMeteoClient::new(&config).context("Failed to build HTTP client")?;
    Almanac::open(config, client, today)
        .await
        .context("Failed to open historical store")
}

async fn run_ask(config: AlmanacConfig, phrase: &str, today: NaiveDate, json: bool) -> Result<()> {
    let almanac = open_almanac(config, today).await?;
    let text = almanac
        .generate_response_at(phrase, today)
        .await
        .context("Failed to answer")?;

    if json {
        println!("{}", serde_json::to_string(&JsonResponse { response: &text })?);
    } else {
        println!("{text}");
    }
    Ok(())
}

async fn run_chat(config: AlmanacConfig, today: Option<NaiveDate>) -> Result<()> {
    let almanac = open_almanac(config, today_or_now(today)).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match almanac.generate_response_at(&line, today_or_now(today)).await {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}

fn run_resolve(config: &AlmanacConfig, phrase: &str, today: NaiveDate) -> ExitCode {
    match resolve_phrase(phrase, today) {
        Some(resolved) => {
            println!("{} ({})", resolved.date, resolved.strategy.name());
            ExitCode::SUCCESS
        }
        None => {
            println!(
                "{}",
                Answer::Unresolved {
                    start: config.start_date,
                    forecast_days: config.forecast_days,
                }
            );
            ExitCode::FAILURE
        }
    }
}

async fn run_bootstrap(config: AlmanacConfig, force: bool) -> Result<()> {
    let today = Utc::now().date_naive();
    let client = OpenMeteoClient::new(&config).context("Failed to build HTTP client")?;
    let at = config.coordinates();

    let store = if force {
        HistoricalStore::rebuild(&config.data_path, config.start_date, at, today, &client).await
    } else {
        HistoricalStore::open(&config.data_path, config.start_date, at, today, &client).await
    }
    .with_context(|| format!("Failed to bootstrap {}", config.data_path.display()))?;

    info!(rows = store.len(), "bootstrap finished");
    match store.last_date() {
        Some(last) => println!(
            "{}: {} days from {} to {}",
            store.path().display(),
            store.len(),
            store.start(),
            last
        ),
        None => println!("{}: no days stored yet", store.path().display()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Ask {
            phrase,
            today,
            json,
        } => run_ask(config, &phrase.join(" "), today_or_now(today), json).await?,
        Command::Chat { today } => run_chat(config, today).await?,
        Command::Resolve { phrase, today } => {
            return Ok(run_resolve(&config, &phrase.join(" "), today_or_now(today)));
        }
        Command::Bootstrap { force } => run_bootstrap(config, force).await?,
    }
    Ok(ExitCode::SUCCESS)
}
