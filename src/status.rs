//! User-facing progress channel.
//!
//! A status line is overwritten by each update and cleared when a turn
//! finishes successfully.

use std::io::Write;
use std::sync::Mutex;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Status::Info(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Status::Error(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Status::Info(text) | Status::Error(text) => text,
        }
    }
}

pub trait StatusSink: Send + Sync {
    /// Replace the current status.
    fn update(&self, status: Status);

    /// Remove the current status.
    fn clear(&self);

    /// Announce a tool call that is about to run.
    fn tool_call(&self, _name: &str, _arguments: &Value) {}
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl StatusSink for Silent {
    fn update(&self, _status: Status) {}

    fn clear(&self) {}
}

/// Renders the status on a single terminal line of stderr.
#[derive(Debug, Default)]
pub struct TerminalStatus {
    lock: Mutex<()>,
}

impl TerminalStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stderr = std::io::stderr().lock();
        // Carriage return plus erase-line keeps the status on one row.
        let _ = write!(stderr, "\r\x1b[2K{}", line);
        let _ = stderr.flush();
    }
}

impl StatusSink for TerminalStatus {
    fn update(&self, status: Status) {
        match status {
            Status::Info(text) => self.write(&text),
            Status::Error(text) => self.write(&format!("\x1b[31m{}\x1b[0m\n", text)),
        }
    }

    fn clear(&self) {
        self.write("");
    }

    fn tool_call(&self, name: &str, arguments: &Value) {
        let args = serde_json::to_string(arguments).unwrap_or_default();
        self.write(&format!("Executing: {} {}\n", name, args));
    }
}

/// Keeps every update in memory. Useful for tests and for embedding.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<StatusEvent>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Update(Status),
    Clear,
    ToolCall { name: String, arguments: Value },
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The status currently shown, if any.
    pub fn current(&self) -> Option<Status> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().rev().find_map(|event| match event {
            StatusEvent::Update(status) => Some(Some(status.clone())),
            StatusEvent::Clear => Some(None),
            StatusEvent::ToolCall { .. } => None,
        })?
    }

    fn record(&self, event: StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl StatusSink for RecordingStatus {
    fn update(&self, status: Status) {
        self.record(StatusEvent::Update(status));
    }

    fn clear(&self) {
        self.record(StatusEvent::Clear);
    }

    fn tool_call(&self, name: &str, arguments: &Value) {
        self.record(StatusEvent::ToolCall {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
    }
}

impl<T: StatusSink + ?Sized> StatusSink for std::sync::Arc<T> {
    fn update(&self, status: Status) {
        (**self).update(status)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn tool_call(&self, name: &str, arguments: &Value) {
        (**self).tool_call(name, arguments)
    }
}
