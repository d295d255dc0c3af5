mod report;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use raidscope_network::LocalBus;
use raidscope_ops::{ensure_state_dir, init_tracing, JsonFileStore, MemoryStore, PersistenceStore};
use raidscope_scraper::{FileRowSource, FreeTextExtractor, IncomingsTableExtractor, RowSource};
use raidscope_tracker::{TrackerRunner, TrackerService};
use raidscope_types::{config::RaidscopeConfig, time_codec::parse_duration};
use tracing::warn;

type SharedStore = Arc<dyn PersistenceStore + Send + Sync>;
type Tracker = TrackerService<SharedStore, LocalBus>;

#[derive(Parser)]
#[command(name = "raidscope", about = "Infer and track incoming attacks from countdowns")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "RAIDSCOPE_CONFIG", default_value = "configs/raidscope.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lists units that could arrive after DURATION ("H:MM:SS" or "MM:SS").
    Match {
        duration: String,
        /// Known distance in fields.
        #[arg(long)]
        distance: Option<f64>,
        /// Maximum deviation in minutes.
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Rescans a text dump of the incomings page until interrupted.
    Watch {
        file: PathBuf,
        /// Read tab-separated incomings table rows instead of free text.
        #[arg(long)]
        table: bool,
    },
    /// Shows tracked observations.
    List,
    /// Forgets every tracked observation.
    Clear,
    /// Sets the world and unit speed used for new observations.
    Configure {
        #[arg(long)]
        world_speed: f64,
        #[arg(long)]
        unit_speed: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config);
    init_tracing(&config.ops)?;

    match cli.command {
        Command::Match {
            duration,
            distance,
            tolerance,
        } => {
            let minutes = parse_duration(&duration);
            if minutes <= 0.0 {
                bail!("'{duration}' is not a usable duration");
            }
            if let Some(tolerance) = tolerance {
                config.tracker.match_tolerance_minutes = tolerance;
            }
            let tracker = open_tracker(&config);
            println!("{}", report::format_match_table(&tracker.match_units(minutes, distance)));
        }
        Command::Watch { file, table } => {
            let tracker = open_tracker(&config);
            tracker.on_change(|event| println!("{}", report::format_event(event, Utc::now())));
            if table {
                watch(tracker, FileRowSource::new(file, IncomingsTableExtractor)).await?;
            } else {
                watch(tracker, FileRowSource::new(file, FreeTextExtractor)).await?;
            }
        }
        Command::List => {
            let tracker = open_tracker(&config);
            let now = Utc::now();
            let observations = tracker.snapshot();
            if observations.is_empty() {
                println!("no tracked incoming attacks");
            }
            for observation in &observations {
                println!("{}", report::format_observation(observation, now));
            }
            println!("{}", report::summary_line(tracker.summary(now)));
        }
        Command::Clear => {
            let removed = open_tracker(&config).clear();
            println!("cleared {removed} observations");
        }
        Command::Configure {
            world_speed,
            unit_speed,
        } => {
            let speed = open_tracker(&config).configure(world_speed, unit_speed);
            println!(
                "world speed {} | unit speed {}",
                speed.world_speed, speed.unit_speed
            );
        }
    }
    Ok(())
}

async fn watch<S: RowSource>(tracker: Tracker, source: S) -> Result<()> {
    let mut runner = TrackerRunner::new(tracker, source)?;
    runner
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "unable to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;
    let now = Utc::now();
    println!("{}", report::summary_line(runner.service().summary(now)));
    Ok(())
}

/// State lives in the configured JSON file; if it cannot be opened the
/// session continues in memory only.
fn open_tracker(config: &RaidscopeConfig) -> Tracker {
    let store: SharedStore = match ensure_state_dir(&config.ops.state_path)
        .and_then(JsonFileStore::open)
    {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(error = %err, "state file unavailable; keeping state in memory");
            Arc::new(MemoryStore::new())
        }
    };
    TrackerService::new(config, store, LocalBus::default())
}

fn load_config(path: &Path) -> RaidscopeConfig {
    if !path.exists() {
        return RaidscopeConfig::default();
    }
    match RaidscopeConfig::from_file(path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                RaidscopeConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            RaidscopeConfig::default()
        }
    }
}
