use std::fs;
use std::path::Path;

use tracing::debug;

/// Reads the recorded daemon pid. A missing, empty or unparseable file
/// means "no daemon recorded": the daemon rewrites this file on every
/// start, so anything else is stale state we must tolerate.
pub fn read_pid(path: &Path) -> Option<u32> {
    let pid = fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse::<u32>().ok())
        .filter(|pid| *pid > 0);
    debug!(path = %path.display(), pid = ?pid, "pid file read");
    pid
}
