use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceEvent, EnrollmentOutcome, Engine, Error as CoreError, MarkOutcome};
use rollcall_store::SqliteStore;
use tracing_subscriber::EnvFilter;

mod capture;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face recognition attendance register")]
struct Cli {
    /// SQLite database path (overrides ROLLCALL_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Similarity threshold (overrides ROLLCALL_SIMILARITY_THRESHOLD)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new person from a capture
    Enroll {
        /// Unique roll or badge number
        #[arg(short, long)]
        key: String,
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Detection document (JSON), or - for stdin
        #[arg(short, long, default_value = "-")]
        detections: PathBuf,
    },
    /// Mark attendance for a recognized face
    Mark {
        /// Detection document (JSON), or - for stdin
        #[arg(short, long, default_value = "-")]
        detections: PathBuf,
    },
    /// List enrolled identities
    List,
    /// Show the most recent attendance events
    Recent {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Enrolled count and recent attendance
    Summary,
    /// Attendance count per person (JSON)
    Counts,
    /// Attendance by day of week and hour (JSON)
    Heatmap {
        /// Emit {x, y, v} chart points instead of buckets
        #[arg(long)]
        points: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(threshold) = cli.threshold {
        config.similarity_threshold = threshold;
    }

    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
    }
    let store = SqliteStore::open(&config.db_path, config.embedding_dim)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let engine = Engine::new(Arc::new(store), config.engine())?;

    match cli.command {
        Commands::Enroll { key, name, detections } => {
            let faces = capture::read_detections(&detections)?;
            match reject_bad_capture(engine.enroll(&key, &name, faces).await)? {
                EnrollmentOutcome::Enrolled { identity_key, display_name } => {
                    println!("Enrolled {display_name} (ID: {identity_key})");
                }
                EnrollmentOutcome::AttendanceMarkedForExisting { identity_key, display_name } => {
                    println!(
                        "Face already exists. Attendance marked for {display_name} (ID: {identity_key})"
                    );
                }
            }
        }
        Commands::Mark { detections } => {
            let faces = capture::read_detections(&detections)?;
            match reject_bad_capture(engine.mark(faces).await)? {
                MarkOutcome::Marked { event } => {
                    println!(
                        "Attendance marked for {} (ID: {})",
                        event.display_name, event.identity_key
                    );
                }
                MarkOutcome::NotRecognized => {
                    bail!("face not recognized, please register first");
                }
            }
        }
        Commands::List => {
            let identities = engine.identities().await?;
            if identities.is_empty() {
                println!("No identities enrolled");
            }
            for identity in identities {
                println!(
                    "{}\t{}\t{}",
                    identity.identity_key,
                    identity.display_name,
                    identity.enrolled_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Recent { limit } => {
            let events = engine
                .recent_attendance(limit.unwrap_or(config.recent_limit))
                .await?;
            print_events(&events);
        }
        Commands::Summary => {
            println!("Enrolled: {}", engine.enrolled_count().await?);
            println!("Recent attendance:");
            print_events(&engine.recent_attendance(config.recent_limit).await?);
        }
        Commands::Counts => {
            let counts = engine.counts_by_identity().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Commands::Heatmap { points } => {
            let json = if points {
                serde_json::to_string_pretty(&engine.heatmap().await?)?
            } else {
                serde_json::to_string_pretty(&engine.occupancy_histogram().await?)?
            };
            println!("{json}");
        }
    }

    Ok(())
}

/// Turn a rejected capture into a recapture hint for the operator.
fn reject_bad_capture<T>(result: rollcall_core::Result<T>) -> Result<T> {
    match result {
        Err(CoreError::MultipleOrNoFaceDetected { count }) => {
            bail!("found {count} faces, please ensure exactly one face is visible")
        }
        Err(CoreError::DegenerateVector) => {
            bail!("capture produced an unusable embedding, please recapture")
        }
        other => Ok(other?),
    }
}

fn print_events(events: &[AttendanceEvent]) {
    if events.is_empty() {
        println!("No attendance recorded");
    }
    for event in events {
        println!(
            "{}\t{}\t{}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.identity_key,
            event.display_name
        );
    }
}
