//! User-interaction sink and background diagnostic forwarding.

use std::io::{BufRead, BufReader, Read};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// Sink for progress and diagnostic text shown to the user.
///
/// Used for observability only, never for control flow.
pub trait Ui: std::fmt::Debug + Send + Sync {
    /// Prominent section header.
    fn header(&self, text: &str);
    /// Free-form progress message.
    fn message(&self, text: &str);
    /// Line-oriented error/diagnostic text.
    fn error(&self, text: &str);
}

/// In-memory UI that records everything it is given.
///
/// The workhorse for tests; also useful for embedders that want to
/// capture driver output instead of printing it.
#[derive(Debug, Default)]
pub struct BufferUi {
    lines: Mutex<Vec<String>>,
}

impl BufferUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("ui buffer poisoned").clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Ui for BufferUi {
    fn header(&self, text: &str) {
        self.lines
            .lock()
            .expect("ui buffer poisoned")
            .push(format!("==> {text}"));
    }

    fn message(&self, text: &str) {
        self.lines
            .lock()
            .expect("ui buffer poisoned")
            .push(text.to_string());
    }

    fn error(&self, text: &str) {
        self.lines
            .lock()
            .expect("ui buffer poisoned")
            .push(format!("error: {text}"));
    }
}

/// Streams line-delimited diagnostic text from `reader` to the UI.
///
/// Spawns a worker that scans the stream line by line, forwards each
/// completed line to [`Ui::error`] in real time, and accumulates the
/// transcript for error reporting. The worker terminates when the
/// write side of the stream closes; for a child process that happens
/// on every exit path once the child is reaped, so callers `wait()`
/// on the child and then join the returned handle to drain the
/// remaining output and collect the transcript.
pub fn forward_lines<R>(reader: R, ui: Arc<dyn Ui>) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut transcript = String::new();
        let scanner = BufReader::new(reader);
        for line in scanner.lines() {
            match line {
                Ok(text) => {
                    ui.error(&text);
                    transcript.push_str(&text);
                    transcript.push('\n');
                }
                Err(e) => {
                    debug!("diagnostic stream closed: {}", e);
                    break;
                }
            }
        }
        transcript
    })
}
