use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{info, warn};

use pmohotutils::retry::{Exhausted, RetryPolicy, retry};

use crate::pidfile::read_pid;
use crate::probe::ProcessProbe;

/// Result of a stop request. Exhausting the retry budget is not an error
/// by itself: the caller decides whether a surviving daemon blocks the
/// rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No recorded process, or it exited within the retry budget.
    Stopped,
    /// The recorded process survived every attempt.
    StillRunning { pid: u32 },
}

#[derive(Debug, Error)]
#[error("process {0} is still running")]
struct StillAlive(u32);

/// Stops the daemon recorded in `pid_file`. Missing or stale pid files
/// succeed trivially, without a single signal being sent. Otherwise each
/// attempt re-checks liveness first, then signals: a process that is
/// already gone is success, a signalling error is logged and retried.
pub fn stop_daemon(
    probe: &mut dyn ProcessProbe,
    pid_file: &Path,
    policy: RetryPolicy,
) -> StopOutcome {
    let Some(pid) = read_pid(pid_file) else {
        info!(pid_file = %pid_file.display(), "no recorded daemon, nothing to stop");
        return StopOutcome::Stopped;
    };

    info!(pid, "stopping recorded daemon");
    let result = retry("daemon stop", policy, |_| {
        if !probe.is_alive(pid) {
            return Ok(());
        }
        if let Err(err) = probe.terminate(pid) {
            warn!(pid, error = %err, "could not signal daemon");
        }
        Err(StillAlive(pid))
    });

    match result {
        Ok(()) => {
            info!(pid, "daemon has exited");
            StopOutcome::Stopped
        }
        Err(err) => {
            warn!(pid, attempts = err.attempts, "daemon refused to die");
            StopOutcome::StillRunning { pid }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("could not launch {binary}: {source}")]
    Spawn { binary: String, source: io::Error },
    #[error("{binary} exited with {status}")]
    Failed { binary: String, status: ExitStatus },
}

/// Launches the daemon with the generated config as its sole argument and
/// waits for the immediate child to exit. The daemon forks into the
/// background itself: exit 0 of the direct child is the launch success
/// signal, and says nothing about protocol readiness; the control
/// connection probes that separately.
pub fn start_daemon(
    binary: &Path,
    config_file: &Path,
    policy: RetryPolicy,
) -> Result<(), Exhausted<StartError>> {
    start_daemon_with(policy, || {
        info!(binary = %binary.display(), config = %config_file.display(), "launching daemon");
        let status = Command::new(binary)
            .arg(config_file)
            .status()
            .map_err(|source| StartError::Spawn {
                binary: binary.display().to_string(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(StartError::Failed {
                binary: binary.display().to_string(),
                status,
            })
        }
    })
}

/// Retry shell around a single launch attempt; the seam the tests drive.
pub fn start_daemon_with<F>(policy: RetryPolicy, mut launch: F) -> Result<(), Exhausted<StartError>>
where
    F: FnMut() -> Result<(), StartError>,
{
    retry("daemon start", policy, |_| launch())
}
