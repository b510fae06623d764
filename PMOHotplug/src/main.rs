//! Point d'entrée : réagit à un événement hotplug de stockage amovible en
//! relançant le démon musical sur le périphérique fraîchement monté.

mod orchestrator;
mod system;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pmohotconfig::HotplugConfig;
use pmohotutils::fsdir::{LockFile, ensure_dir};

use crate::orchestrator::{HotplugAction, HotplugEvent, Orchestrator};
use crate::system::{MpdPlayer, SystemDaemon, SystemMounts, TemplateGenerator};

/// Restarts the media daemon on the device behind a hotplug event.
#[derive(Debug, Parser)]
#[command(name = "pmohotplug", version, about)]
struct Args {
    /// Hotplug action reported by the event source
    #[arg(value_enum)]
    action: CliAction,

    /// Raw device path, e.g. /devices/.../block/sda/sda1
    device_path: String,

    /// Alternative configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAction {
    Add,
    Remove,
}

impl From<CliAction> for HotplugAction {
    fn from(action: CliAction) -> Self {
        match action {
            CliAction::Add => HotplugAction::Add,
            CliAction::Remove => HotplugAction::Remove,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = HotplugConfig::load(args.config.as_deref())?;

    ensure_dir(&config.control_dir).context("control directory unusable")?;

    let _lock = LockFile::acquire(&config.lock_file(), config.retries.lock.policy())
        .context("another invocation is still running")?;

    let event = HotplugEvent {
        action: args.action.into(),
        device_path: args.device_path,
    };

    let mut orchestrator = Orchestrator::new(
        &config,
        SystemDaemon::new(&config),
        SystemMounts::new(&config),
        TemplateGenerator::new(&config),
        MpdPlayer::new(&config),
    );
    orchestrator.run(&event)?;

    info!("✅ hotplug event handled");
    Ok(())
}
