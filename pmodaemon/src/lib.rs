//! Cycle de vie du démon média.
//!
//! Deux responsabilités, toutes deux idempotentes :
//! - **stop** : lire le pid enregistré, signaler le processus, attendre sa
//!   disparition (sondage borné)
//! - **start** : lancer le binaire du démon et attendre la sortie du fils
//!   immédiat (le démon se détache lui-même)
//!
//! The pid file itself is written by the daemon: the generated config
//! points it at the control directory, and the immediate child we wait on
//! is never the daemon's final process.

pub mod lifecycle;
pub mod pidfile;
pub mod probe;

pub use lifecycle::{StartError, StopOutcome, start_daemon, start_daemon_with, stop_daemon};
pub use pidfile::read_pid;
pub use probe::{ProbeError, ProcessProbe, SystemProbe};
