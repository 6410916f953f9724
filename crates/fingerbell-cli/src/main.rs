//! fingerbell - fingerprint doorbell simulator
//!
//! Runs the doorbell controller against a simulated sensor and a SQLite
//! preference store. Commands typed on stdin move a finger on and off the
//! sensor, enroll and delete templates, and exercise sensor pairing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fingerbell_engine::{FingerprintController, PairingStatus, TracingSink};
use fingerbell_hardware::devices::AnySensorLink;
use fingerbell_hardware::mock::{MockSensor, MockSensorHandle};
use fingerbell_storage::{Database, SqlitePreferenceStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod command;
mod config;

use command::{Command, HELP};
use config::FileConfig;

type Controller = FingerprintController<AnySensorLink, SqlitePreferenceStore, TracingSink>;

/// fingerbell - fingerprint doorbell simulator
#[derive(Parser, Debug)]
#[command(name = "fingerbell")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite preference database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let db_config = file_config.database_config(cli.database.as_deref());
    info!(path = %db_config.path.display(), "Opening preference database");
    let database = Database::new(db_config)
        .await
        .context("Failed to open preference database")?;
    let store = database.preferences();

    let (sensor, handle) = MockSensor::new();
    let mut controller = FingerprintController::new(
        file_config.engine,
        AnySensorLink::Mock(sensor),
        store,
        TracingSink,
    )?;

    if let Err(e) = controller.setup().await {
        warn!(error = %e, "Setup did not complete");
    }

    run(&mut controller, &handle).await?;

    database.close().await;
    Ok(())
}

async fn run(controller: &mut Controller, handle: &MockSensorHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("{}", HELP);
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        execute(controller, handle, command).await?;
    }

    Ok(())
}

async fn execute(
    controller: &mut Controller,
    handle: &MockSensorHandle,
    command: Command,
) -> Result<()> {
    match command {
        Command::Place(print) => handle.place_finger(print),
        Command::Smudge => handle.place_smudged(),
        Command::Lift => handle.lift_finger(),
        Command::Tick(count) => {
            let interval = controller.config().poll_interval();
            for _ in 0..count {
                sleep(interval).await;
                if let Some(result) = controller.tick().await {
                    println!("{}", serde_json::to_string(&result)?);
                }
            }
        }
        Command::Enroll { id, name } => {
            // Five clean presentations of a print named after the slot.
            let print = u32::try_from(id).unwrap_or(0);
            handle.script_enrollment(print);
            match controller.enroll(id, &name).await {
                Ok(()) => println!("enrolled {} at slot {} (print {})", name, id, print),
                Err(e) => println!("enrollment failed: {}", e),
            }
        }
        Command::Delete(id) => match controller.delete(id).await {
            Ok(()) => println!("deleted slot {}", id),
            Err(e) => println!("delete failed: {}", e),
        },
        Command::Clear => match controller.clear_all().await {
            Ok(()) => println!("all templates deleted"),
            Err(e) => println!("clear failed: {}", e),
        },
        Command::Pair => match controller.pair().await {
            Ok(()) => println!("paired"),
            Err(e) => println!("pairing failed: {}", e),
        },
        Command::Check => report_pairing(controller).await,
        Command::Swap => {
            handle.swap_sensor([]);
            println!("sensor replaced with a blank unit");
            report_pairing(controller).await;
        }
        Command::Status => {
            println!(
                "{}",
                serde_json::to_string_pretty(controller.observations())?
            );
            println!("session: {}", controller.state());
            println!("enrolled names:");
            for (slot, name) in controller.registry().iter() {
                println!("  {:>3}  {}", slot, name);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn report_pairing(controller: &mut Controller) {
    match controller.check_pairing().await {
        Ok(status @ (PairingStatus::Paired | PairingStatus::Valid)) => {
            println!("pairing {}", status)
        }
        Ok(status) => println!("pairing {}: identifications are not trusted", status),
        Err(e) => println!("pairing check failed: {}", e),
    }
}
