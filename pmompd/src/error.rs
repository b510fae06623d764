//! Types d'erreurs pour pmompd.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MpdError {
    #[error("I/O error talking to the daemon: {0}")]
    Io(#[from] io::Error),

    #[error("no socket address resolved for {0}")]
    NoAddress(String),

    #[error("unexpected greeting from daemon: {0:?}")]
    BadGreeting(String),

    #[error("connection closed mid-response")]
    ConnectionClosed,

    #[error("daemon refused `{command}`: {message}")]
    Ack { command: String, message: String },

    #[error("{0} command(s) of the batch failed")]
    Batch(u32),
}

/// Type Result spécialisé pour pmompd
pub type Result<T> = std::result::Result<T, MpdError>;
