//! Séquencement d'un événement hotplug.
//!
//! L'orchestrateur décide quoi exécuter selon l'action :
//! - **remove** : arrêter le démon, rien d'autre
//! - **add** : arrêt → attente du montage → génération de la config →
//!   démarrage → rescan et lecture
//!
//! Fatal failures (mount timeout, start exhaustion) abort the run with an
//! error; soft failures (stop timeout, reindex/play) are logged and the
//! run still succeeds: once the device is mounted and the daemon
//! restarted, playback is a convenience.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use pmodaemon::StopOutcome;
use pmohotconfig::HotplugConfig;
use pmohotutils::mount::mount_point_for;

/// Hotplug action delivered by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
}

/// One hotplug notification, consumed once per invocation.
#[derive(Debug, Clone)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    pub device_path: String,
}

/// Stop/start of the daemon process (pmodaemon behind it). `start` owns
/// its own retry budget; an `Err` means the budget is exhausted.
pub trait DaemonControl {
    fn stop(&mut self) -> StopOutcome;
    fn start(&mut self) -> Result<()>;
}

/// Bounded wait for a path to become a mount point.
pub trait MountWait {
    fn wait_for_mount(&mut self, mount_point: &Path) -> Result<()>;
}

/// Full regeneration of the daemon config for the given music directory.
pub trait ConfigGenerate {
    fn generate(&mut self, music_dir: &Path) -> Result<()>;
}

/// Control-protocol session driving rescan and playback.
pub trait PlayerControl {
    fn reindex_and_play(&mut self) -> Result<()>;
}

pub struct Orchestrator<'a, D, M, C, P> {
    config: &'a HotplugConfig,
    daemon: D,
    mounts: M,
    generator: C,
    player: P,
}

impl<'a, D, M, C, P> Orchestrator<'a, D, M, C, P>
where
    D: DaemonControl,
    M: MountWait,
    C: ConfigGenerate,
    P: PlayerControl,
{
    pub fn new(config: &'a HotplugConfig, daemon: D, mounts: M, generator: C, player: P) -> Self {
        Self {
            config,
            daemon,
            mounts,
            generator,
            player,
        }
    }

    pub fn run(&mut self, event: &HotplugEvent) -> Result<()> {
        info!(action = ?event.action, device = %event.device_path, "handling hotplug event");
        match event.action {
            HotplugAction::Remove => self.stop_daemon(),
            HotplugAction::Add => self.run_add(&event.device_path),
        }
    }

    // L'ancien démon est arrêté dans les deux modes.
    fn stop_daemon(&mut self) -> Result<()> {
        match self.daemon.stop() {
            StopOutcome::Stopped => Ok(()),
            StopOutcome::StillRunning { pid } => {
                if self.config.proceed_after_stop_timeout {
                    warn!(pid, "old daemon still running, proceeding anyway");
                    Ok(())
                } else {
                    bail!("daemon (pid {pid}) refused to stop");
                }
            }
        }
    }

    fn run_add(&mut self, device_path: &str) -> Result<()> {
        self.stop_daemon()?;

        let mount_point = mount_point_for(device_path, &self.config.mount_root)
            .context("cannot derive mount point from device path")?;

        info!(mount_point = %mount_point.display(), "waiting for device to be mounted");
        self.mounts.wait_for_mount(&mount_point).with_context(|| {
            format!("timeout waiting for {} to be mounted", mount_point.display())
        })?;

        info!("generating daemon config");
        self.generator
            .generate(&mount_point)
            .context("could not generate daemon config")?;

        self.daemon
            .start()
            .context("failure starting daemon process")?;

        info!("bumping player to rescan and start playing");
        if let Err(err) = self.player.reindex_and_play() {
            // non fatal : le périphérique est monté, le démon tourne
            warn!(error = %err, "could not drive the player");
        }
        Ok(())
    }
}
