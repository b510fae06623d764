use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, warn};

use pmohotutils::retry::{Exhausted, RetryPolicy, retry};

use crate::command::Command;
use crate::error::{MpdError, Result};

/// An owned request/response session with the daemon's control endpoint.
/// Never held across orchestration steps: connect, run one batch, close.
#[derive(Debug)]
pub struct Connection {
    stream: BufReader<TcpStream>,
    peer: String,
    version: String,
}

impl Connection {
    /// Opens a fresh TCP connection and verifies the protocol greeting.
    /// A zero `timeout` means the platform defaults (no explicit socket
    /// timeouts), mirroring the daemon library's convention.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let peer = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };

        let mut last_err: Option<MpdError> = None;
        for addr in peer.to_socket_addrs()? {
            let connected = if timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, timeout)
            };
            match connected {
                Ok(stream) => {
                    if !timeout.is_zero() {
                        stream.set_read_timeout(Some(timeout))?;
                        stream.set_write_timeout(Some(timeout))?;
                    }
                    return Self::handshake(stream, peer);
                }
                Err(err) => last_err = Some(err.into()),
            }
        }
        Err(last_err.unwrap_or(MpdError::NoAddress(peer)))
    }

    fn handshake(stream: TcpStream, peer: String) -> Result<Self> {
        let mut connection = Self {
            stream: BufReader::new(stream),
            peer,
            version: String::new(),
        };
        let greeting = connection.read_line()?;
        let Some(version) = greeting.strip_prefix("OK MPD ") else {
            return Err(MpdError::BadGreeting(greeting));
        };
        connection.version = version.to_string();
        debug!(peer = %connection.peer, version = %connection.version, "connected to daemon");
        Ok(connection)
    }

    /// Protocol version announced in the greeting.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sends one command and collects its response payload (the
    /// `key: value` lines before the terminating `OK`).
    pub fn run(&mut self, command: &Command) -> Result<Vec<String>> {
        let line = command.line();
        debug!(peer = %self.peer, command = %line, "sending command");
        self.write_line(&line)?;
        self.read_response(&line)
    }

    /// Closes the session. Best-effort `close` command, then shutdown;
    /// nothing is left open past the invocation.
    pub fn close(mut self) {
        let _ = self.write_line("close");
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.stream.read_line(&mut line)? == 0 {
            return Err(MpdError::ConnectionClosed);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn read_response(&mut self, command: &str) -> Result<Vec<String>> {
        let mut payload = Vec::new();
        loop {
            let line = self.read_line()?;
            if line == "OK" {
                return Ok(payload);
            }
            if let Some(message) = line.strip_prefix("ACK") {
                return Err(MpdError::Ack {
                    command: command.to_string(),
                    message: message.trim().to_string(),
                });
            }
            payload.push(line);
        }
    }
}

/// Connection establishment with bounded retry; every attempt opens a
/// fresh connection, there is no pooling in a single-shot tool.
pub fn connect_with_retry(
    host: &str,
    port: u16,
    timeout: Duration,
    policy: RetryPolicy,
) -> std::result::Result<Connection, Exhausted<MpdError>> {
    retry("daemon connect", policy, |_| {
        Connection::connect(host, port, timeout)
    })
}

/// Issues the batch best-effort. Each command's failure is logged and the
/// batch runs to completion: failing to clear the queue must not prevent
/// attempting to start playback. Returns the number of failed commands.
pub fn run_batch(connection: &mut Connection, commands: &[Command]) -> u32 {
    let mut failures = 0;
    for command in commands {
        match connection.run(command) {
            Ok(_) => debug!(command = %command.line(), "command accepted"),
            Err(err) => {
                warn!(command = %command.line(), error = %err, "command failed");
                failures += 1;
            }
        }
    }
    failures
}

/// Full rescan-and-play sequence: connect with retry, drive the batch,
/// close, and re-run the whole round while any command keeps failing
/// (the daemon may still be warming up right after its start).
pub fn reindex_and_play(
    host: &str,
    port: u16,
    timeout: Duration,
    connect_policy: RetryPolicy,
    play_policy: RetryPolicy,
) -> std::result::Result<(), Exhausted<MpdError>> {
    retry("reindex and play", play_policy, |_| {
        let mut connection = connect_with_retry(host, port, timeout, connect_policy)
            .map_err(|exhausted| exhausted.source)?;
        info!(version = %connection.version(), "connected, driving player");
        let failures = run_batch(&mut connection, &Command::reindex_and_play());
        connection.close();
        if failures == 0 {
            Ok(())
        } else {
            Err(MpdError::Batch(failures))
        }
    })
}
