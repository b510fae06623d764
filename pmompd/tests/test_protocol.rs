use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pmohotutils::retry::RetryPolicy;
use pmompd::{Command, Connection, MpdError, connect_with_retry, reindex_and_play, run_batch};

const TIMEOUT: Duration = Duration::from_millis(500);

/// Serveur MPD scripté sur l'interface de bouclage : accepte `sessions`
/// connexions successives, salue, puis répond via `respond(session, ligne)`.
fn spawn_fake_mpd(
    sessions: usize,
    greeting: &'static str,
    respond: impl Fn(usize, &str) -> String + Send + 'static,
) -> (
    SocketAddr,
    mpsc::Receiver<Vec<String>>,
    thread::JoinHandle<()>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        for session in 0..sessions {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            writer.write_all(greeting.as_bytes()).unwrap();

            let mut received = Vec::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                received.push(line.clone());
                if line == "close" {
                    break;
                }
                writer
                    .write_all(respond(session, &line).as_bytes())
                    .unwrap();
            }
            tx.send(received).unwrap();
        }
    });

    (addr, rx, handle)
}

fn always_ok(_session: usize, _line: &str) -> String {
    "OK\n".to_string()
}

#[test]
fn test_connect_reads_greeting() {
    let (addr, rx, handle) = spawn_fake_mpd(1, "OK MPD 0.23.5\n", always_ok);
    let connection = Connection::connect(&addr.ip().to_string(), addr.port(), TIMEOUT).unwrap();
    assert_eq!(connection.version(), "0.23.5");
    connection.close();

    assert_eq!(rx.recv().unwrap(), vec!["close".to_string()]);
    handle.join().unwrap();
}

#[test]
fn test_bad_greeting_is_rejected() {
    let (addr, _rx, handle) = spawn_fake_mpd(1, "HELLO 1.0\n", always_ok);
    let err = Connection::connect(&addr.ip().to_string(), addr.port(), TIMEOUT).unwrap_err();
    assert!(matches!(err, MpdError::BadGreeting(_)));
    handle.join().unwrap();
}

#[test]
fn test_command_payload_before_ok() {
    let (addr, rx, handle) = spawn_fake_mpd(1, "OK MPD 0.23.5\n", |_, line| {
        if line == "update" {
            "updating_db: 7\nOK\n".to_string()
        } else {
            "OK\n".to_string()
        }
    });

    let mut connection =
        Connection::connect(&addr.ip().to_string(), addr.port(), TIMEOUT).unwrap();
    let payload = connection.run(&Command::Update).unwrap();
    assert_eq!(payload, vec!["updating_db: 7".to_string()]);
    connection.close();

    assert_eq!(rx.recv().unwrap(), vec!["update", "close"]);
    handle.join().unwrap();
}

#[test]
fn test_batch_continues_past_ack() {
    // `clear` est refusé ; les trois autres commandes doivent quand même partir
    let (addr, rx, handle) = spawn_fake_mpd(1, "OK MPD 0.23.5\n", |_, line| {
        if line == "clear" {
            "ACK [5@0] {clear} what are you doing\n".to_string()
        } else {
            "OK\n".to_string()
        }
    });

    let mut connection =
        Connection::connect(&addr.ip().to_string(), addr.port(), TIMEOUT).unwrap();
    let failures = run_batch(&mut connection, &Command::reindex_and_play());
    assert_eq!(failures, 1);
    connection.close();

    assert_eq!(
        rx.recv().unwrap(),
        vec!["update", "clear", "add \"\"", "play", "close"]
    );
    handle.join().unwrap();
}

#[test]
fn test_ack_maps_to_error() {
    let (addr, _rx, handle) = spawn_fake_mpd(1, "OK MPD 0.23.5\n", |_, _| {
        "ACK [50@0] {play} no such song\n".to_string()
    });

    let mut connection =
        Connection::connect(&addr.ip().to_string(), addr.port(), TIMEOUT).unwrap();
    let err = connection.run(&Command::Play).unwrap_err();
    match err {
        MpdError::Ack { command, message } => {
            assert_eq!(command, "play");
            assert_eq!(message, "[50@0] {play} no such song");
        }
        other => panic!("unexpected error: {other}"),
    }
    connection.close();
    handle.join().unwrap();
}

#[test]
fn test_connect_with_retry_exhausts_on_dead_port() {
    // réserve un port puis le libère : connexion refusée à chaque tentative
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = connect_with_retry(
        &addr.ip().to_string(),
        addr.port(),
        TIMEOUT,
        RetryPolicy::immediate(3),
    )
    .unwrap_err();
    assert_eq!(err.attempts, 3);
    assert!(matches!(err.source, MpdError::Io(_)));
}

#[test]
fn test_reindex_and_play_reruns_until_clean() {
    // 1re session : update refusé ; 2e session : tout passe
    let (addr, rx, handle) = spawn_fake_mpd(2, "OK MPD 0.23.5\n", |session, line| {
        if session == 0 && line == "update" {
            "ACK [54@0] {update} not ready\n".to_string()
        } else {
            "OK\n".to_string()
        }
    });

    reindex_and_play(
        &addr.ip().to_string(),
        addr.port(),
        TIMEOUT,
        RetryPolicy::immediate(2),
        RetryPolicy::immediate(3),
    )
    .unwrap();

    let first = rx.recv().unwrap();
    let second = rx.recv().unwrap();
    assert_eq!(first, vec!["update", "clear", "add \"\"", "play", "close"]);
    assert_eq!(second, vec!["update", "clear", "add \"\"", "play", "close"]);
    handle.join().unwrap();
}
