//! Implémentations réelles des collaborateurs de l'orchestrateur.

use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

use anyhow::{Context, Result};

use pmodaemon::{StopOutcome, SystemProbe, start_daemon, stop_daemon};
use pmohotconfig::HotplugConfig;
use pmohotutils::mount::MountTable;
use pmohotutils::template::{expand, expand_file};

use crate::orchestrator::{ConfigGenerate, DaemonControl, MountWait, PlayerControl};

/// Daemon lifecycle against the live process table.
pub struct SystemDaemon<'a> {
    config: &'a HotplugConfig,
    probe: SystemProbe,
}

impl<'a> SystemDaemon<'a> {
    pub fn new(config: &'a HotplugConfig) -> Self {
        Self {
            config,
            probe: SystemProbe::new(),
        }
    }
}

impl DaemonControl for SystemDaemon<'_> {
    fn stop(&mut self) -> StopOutcome {
        stop_daemon(
            &mut self.probe,
            &self.config.pid_file(),
            self.config.retries.stop.policy(),
        )
    }

    fn start(&mut self) -> Result<()> {
        start_daemon(
            &self.config.daemon_bin,
            &self.config.config_file(),
            self.config.retries.start.policy(),
        )?;
        Ok(())
    }
}

/// Mount wait against the live mount table.
pub struct SystemMounts<'a> {
    config: &'a HotplugConfig,
    table: MountTable,
}

impl<'a> SystemMounts<'a> {
    pub fn new(config: &'a HotplugConfig) -> Self {
        Self {
            config,
            table: MountTable::default(),
        }
    }
}

impl MountWait for SystemMounts<'_> {
    fn wait_for_mount(&mut self, mount_point: &Path) -> Result<()> {
        self.table
            .wait_for_mount(mount_point, self.config.retries.mount.policy())?;
        Ok(())
    }
}

/// Regenerates the daemon config from the template (file or embedded),
/// substituting the placeholder with the music directory. The destination
/// is rewritten from scratch on every add event, so the generated config
/// never straddles two devices.
pub struct TemplateGenerator<'a> {
    config: &'a HotplugConfig,
}

impl<'a> TemplateGenerator<'a> {
    pub fn new(config: &'a HotplugConfig) -> Self {
        Self { config }
    }
}

impl ConfigGenerate for TemplateGenerator<'_> {
    fn generate(&mut self, music_dir: &Path) -> Result<()> {
        let destination = self.config.config_file();
        let replacement = music_dir.to_string_lossy();
        match &self.config.template_file {
            Some(template) => {
                expand_file(template, &destination, &self.config.placeholder, &replacement)?;
            }
            None => {
                let output = File::create(&destination).with_context(|| {
                    format!("cannot create generated file {}", destination.display())
                })?;
                expand(
                    Cursor::new(HotplugConfig::default_template().as_bytes()),
                    BufWriter::new(output),
                    &self.config.placeholder,
                    &replacement,
                )?;
            }
        }
        Ok(())
    }
}

/// Control-protocol session against the daemon endpoint.
pub struct MpdPlayer<'a> {
    config: &'a HotplugConfig,
}

impl<'a> MpdPlayer<'a> {
    pub fn new(config: &'a HotplugConfig) -> Self {
        Self { config }
    }
}

impl PlayerControl for MpdPlayer<'_> {
    fn reindex_and_play(&mut self) -> Result<()> {
        pmompd::reindex_and_play(
            &self.config.mpd_host,
            self.config.mpd_port,
            self.config.connect_timeout(),
            self.config.retries.connect.policy(),
            self.config.retries.play.policy(),
        )?;
        Ok(())
    }
}
