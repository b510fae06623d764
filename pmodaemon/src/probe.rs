use sysinfo::{Pid, Signal, System};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("termination signal not supported on this platform")]
    Unsupported,
    #[error("failed to signal pid {0}")]
    SignalFailed(u32),
}

/// Seam over the process table, so stop logic can be tested without
/// touching live processes. "Process not found" is reported through
/// [`ProcessProbe::is_alive`], never as a [`ProbeError`].
pub trait ProcessProbe {
    /// Fresh liveness check against the process table.
    fn is_alive(&mut self, pid: u32) -> bool;

    /// Sends the termination signal to a live process.
    fn terminate(&mut self, pid: u32) -> Result<(), ProbeError>;
}

/// Real probe backed by the system process table.
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn is_alive(&mut self, pid: u32) -> bool {
        self.system.refresh_process(Pid::from_u32(pid))
    }

    fn terminate(&mut self, pid: u32) -> Result<(), ProbeError> {
        match self.system.process(Pid::from_u32(pid)) {
            // Already gone; the next liveness check reports success.
            None => Ok(()),
            Some(process) => match process.kill_with(Signal::Interrupt) {
                Some(true) => Ok(()),
                Some(false) => Err(ProbeError::SignalFailed(pid)),
                None => Err(ProbeError::Unsupported),
            },
        }
    }
}
