//! Daydex demo driver
//!
//! Plays the role of the module and the session driver around one engine
//! instance over a sleep-session record store:
//! - seed a history directly into the store (data the index has never seen)
//! - advance backfill a bounded number of chunks per session, with a delay
//! - pause/resume, status, range reads, full reset
//!
//! State lives in JSON-file collections, so coverage and backfill progress
//! survive across invocations.

use anyhow::Result;
use chrono::{Duration, Local, TimeZone};
use clap::{Parser, Subcommand};
use daydex::{
    Config, DailySummary, DateIndexEngine, DateRecord, IndexEntry, IndexMetadata, JsonFileStore,
    KvCollection,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "daydex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Date-indexed storage engine demo driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory override
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed sleep sessions straight into the record store
    Seed {
        /// Days of history to generate
        #[arg(long, default_value = "120")]
        days: u32,
        /// Sessions per day
        #[arg(long, default_value = "1")]
        per_day: u32,
    },

    /// Show engine coverage and backfill state
    Status,

    /// Run one backfill session (bounded chunks with a delay between them)
    Backfill {
        /// Maximum chunks this session
        #[arg(long, default_value = "4")]
        max_chunks: u32,
        /// Days per chunk (default: from config)
        #[arg(long)]
        chunk_days: Option<u32>,
        /// Delay between chunks in milliseconds
        #[arg(long, default_value = "250")]
        delay_ms: u64,
    },

    /// Read the last N days of records
    Read {
        #[arg(long, default_value = "7")]
        last: u32,
    },

    /// Daily summary for a date (YYYY-MM-DD, default today)
    Summary {
        date: Option<String>,
    },

    /// Pause backfill
    Pause,

    /// Resume backfill
    Resume,

    /// Delete all records and reset the index
    Reset,
}

/// The demo module's record type
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SleepSession {
    id: String,
    bed_time_millis: i64,
    duration_minutes: f64,
    is_nap: bool,
}

impl DateRecord for SleepSession {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn event_timestamp_millis(&self) -> i64 {
        self.bed_time_millis
    }

    fn summary_fields(&self) -> Vec<(&'static str, f64)> {
        let kind = if self.is_nap {
            ("nap", 1.0)
        } else {
            ("mainSleep", 1.0)
        };
        vec![kind, ("totalMinutes", self.duration_minutes)]
    }
}

struct App {
    engine: DateIndexEngine<SleepSession>,
    records: Arc<JsonFileStore<SleepSession>>,
    chunk_days: u32,
}

fn open_app(config: &Config, data_dir: PathBuf) -> Result<App> {
    let records: Arc<JsonFileStore<SleepSession>> =
        Arc::new(JsonFileStore::open(data_dir.join("records.json"))?);
    let index: Arc<JsonFileStore<IndexEntry>> =
        Arc::new(JsonFileStore::open(data_dir.join("date_index.json"))?);
    let summaries: Arc<JsonFileStore<DailySummary>> =
        Arc::new(JsonFileStore::open(data_dir.join("daily_summary.json"))?);
    let meta: Arc<JsonFileStore<IndexMetadata>> =
        Arc::new(JsonFileStore::open(data_dir.join("index_meta.json"))?);

    let engine = DateIndexEngine::with_config(
        config.engine.clone(),
        records.clone(),
        index,
        summaries,
        meta,
    );
    Ok(App {
        engine,
        records,
        chunk_days: config.engine.backfill_chunk_days,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(|| config.resolved_data_dir());
    tracing::info!("data directory: {:?}", data_dir);
    let app = open_app(&config, data_dir)?;

    match cli.command {
        Commands::Seed { days, per_day } => {
            let today = Local::now().date_naive();
            let mut created = 0u32;
            for days_ago in 0..days {
                let date = today - Duration::days(days_ago as i64);
                for slot in 0..per_day {
                    let is_nap = slot > 0;
                    let hour = if is_nap { 14 } else { 22 };
                    let bed_time = Local
                        .from_local_datetime(&date.and_hms_opt(hour, 30, 0).unwrap())
                        .earliest()
                        .unwrap()
                        .timestamp_millis();
                    let session = SleepSession {
                        id: uuid::Uuid::new_v4().to_string(),
                        bed_time_millis: bed_time,
                        duration_minutes: if is_nap {
                            30.0 + (days_ago % 4) as f64 * 15.0
                        } else {
                            380.0 + (days_ago % 7) as f64 * 20.0
                        },
                        is_nap,
                    };
                    app.records.put(&session.id.clone(), session).await?;
                    created += 1;
                }
            }
            println!(
                "seeded {created} sessions over {days} days (index has not seen them yet)"
            );
        }

        Commands::Status => {
            let status = app.engine.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Backfill {
            max_chunks,
            chunk_days,
            delay_ms,
        } => {
            let chunk_days = chunk_days.unwrap_or(app.chunk_days);
            let mut chunks = 0u32;
            while chunks < max_chunks {
                if !app.engine.backfill_next_chunk(chunk_days).await? {
                    break;
                }
                chunks += 1;
                if chunks < max_chunks {
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                }
            }
            let status = app.engine.status().await?;
            println!(
                "session done: {chunks} chunk(s), indexed from {:?}, complete: {}",
                status.indexed_from_date_key, status.backfill_complete
            );
        }

        Commands::Read { last } => {
            let today = Local::now().date_naive();
            let start = today - Duration::days(last.saturating_sub(1) as i64);
            let sessions = app.engine.read_range(start, today).await?;
            println!("{} sessions in the last {last} day(s)", sessions.len());
            for session in sessions {
                let kind = if session.is_nap { "nap" } else { "sleep" };
                println!(
                    "  {}  {:>5.0} min  {}  {}",
                    session.day_key(),
                    session.duration_minutes,
                    kind,
                    session.id
                );
            }
        }

        Commands::Summary { date } => {
            let date = match date {
                Some(s) => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")?,
                None => Local::now().date_naive(),
            };
            let summary = app.engine.daily_summary(date, None).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Pause => {
            app.engine.set_backfill_paused(true).await?;
            println!("backfill paused");
        }

        Commands::Resume => {
            app.engine.set_backfill_paused(false).await?;
            println!("backfill resumed");
        }

        Commands::Reset => {
            app.engine.clear_all().await?;
            println!("all records deleted, index reset");
        }
    }

    Ok(())
}
