//! Client du protocole de contrôle MPD.
//!
//! Le protocole est une session requête/réponse en lignes de texte sur
//! TCP : le serveur salue avec `OK MPD <version>`, chaque commande tient
//! sur une ligne, chaque réponse se termine par `OK` ou par
//! `ACK [err@cmd] {cmd} message`.
//!
//! Connections are owned, time-bounded sessions: opened, used for one
//! command batch, then closed. Every reconnect is a fresh TCP connection.

pub mod client;
pub mod command;
pub mod error;

pub use client::{Connection, connect_with_retry, reindex_and_play, run_batch};
pub use command::Command;
pub use error::{MpdError, Result};
