//! User-facing operation transcript.
//!
//! Orchestrators never print. They append [`LogEvent`]s to a [`LogSink`]
//! through a cloneable [`Log`] handle, and the surrounding shell decides how
//! to render them (terminal, HTML, JSON). Diagnostics for developers go
//! through `tracing` instead.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    /// Raw stdout of an external tool.
    Output,
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub text: String,
    /// Tool output is streamed without a timestamp prefix.
    pub timestamped: bool,
}

impl LogEvent {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            text: text.into(),
            timestamped: true,
        }
    }

    pub fn untimestamped(mut self) -> Self {
        self.timestamped = false;
        self
    }
}

pub trait LogSink: Send + Sync {
    fn append(&self, event: LogEvent);
}

/// Forwards every event into an unbounded channel, turning the transcript
/// into a stream a caller can subscribe to.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn append(&self, event: LogEvent) {
        // Receiver gone means nobody is rendering anymore.
        let _ = self.tx.send(event);
    }
}

#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// All event texts joined by newlines, handy for assertions.
    pub fn transcript(&self) -> String {
        self.events()
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl LogSink for MemorySink {
    fn append(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[derive(Clone)]
pub struct Log {
    sink: Arc<dyn LogSink>,
}

impl Log {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn append(&self, event: LogEvent) {
        self.sink.append(event);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.sink.append(LogEvent::new(LogLevel::Info, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.sink.append(LogEvent::new(LogLevel::Error, text));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.sink.append(LogEvent::new(LogLevel::Success, text));
    }

    pub fn blank(&self) {
        self.info("");
    }

    /// Stdout chunk from a running tool. Chunk boundaries are whatever the
    /// tool flushed; whitespace-only chunks are dropped.
    pub fn output(&self, chunk: &[u8]) {
        self.chunk(LogLevel::Output, chunk);
    }

    /// Stderr chunk from a running tool.
    pub fn stderr(&self, chunk: &[u8]) {
        self.chunk(LogLevel::Error, chunk);
    }

    fn chunk(&self, level: LogLevel, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.sink
            .append(LogEvent::new(level, text.to_string()).untimestamped());
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn render_html(event: &LogEvent) -> String {
    let body = escape_html(&event.text);
    let body = match event.level {
        LogLevel::Info | LogLevel::Output => body,
        LogLevel::Error => format!("<font color=\"#ff5555\">{}</font>", body),
        LogLevel::Success => format!("<font color=\"#50fa7b\"><b>{}</b></font>", body),
    };

    if event.timestamped {
        format!(
            "<span style=\"color:#888888\">[{}]</span> {}",
            event.timestamp.format("%H:%M:%S"),
            body
        )
    } else {
        body
    }
}

pub fn render_plain(event: &LogEvent) -> String {
    if event.timestamped {
        format!("[{}] {}", event.timestamp.format("%H:%M:%S"), event.text)
    } else {
        event.text.clone()
    }
}
