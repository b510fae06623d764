/// One command of the reindex-and-play batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rescan the music database.
    Update,
    /// Clear the play queue.
    Clear,
    /// Append a URI to the queue; the empty URI is the library root.
    Add(String),
    /// Start playback.
    Play,
}

impl Command {
    /// Wire form of the command, newline excluded.
    pub fn line(&self) -> String {
        match self {
            Command::Update => "update".to_string(),
            Command::Clear => "clear".to_string(),
            Command::Add(uri) => format!("add \"{}\"", escape(uri)),
            Command::Play => "play".to_string(),
        }
    }

    /// The batch driven after a daemon restart: rescan the library, drop
    /// the stale queue, enqueue the library root, start playing.
    pub fn reindex_and_play() -> Vec<Command> {
        vec![
            Command::Update,
            Command::Clear,
            Command::Add(String::new()),
            Command::Play,
        ]
    }
}

// Quoting rules of the protocol: backslash escapes inside double quotes.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
