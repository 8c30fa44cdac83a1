//! Decoupled logging collaborator for lifecycle runs.
//!
//! Helpers never reach for a process-wide logger. Each one receives an
//! `Arc<LogCollector>` at construction and reports through it, which keeps
//! the side effects of a single run observable and attributable.
//!
//! # Architecture
//!
//! ```text
//! Helper / Orchestrator
//!     |
//! [LogCollector]
//!     |-----------------------------.
//!     |                             | (crossbeam unbounded channel)
//!     v                             v
//! [Session buffer]            [DiskPersister thread]
//! (in memory, inspectable)    <log_dir>/<ts>_run.log
//! ```
//!
//! The collector also implements `log::Log`, so the binary can register it as
//! the global logger and capture `log::info!` output from the orchestrator.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Target used for high-level phase transition lines.
pub const PARSED_TARGET: &str = "parsed";

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker carrying the ack channel
    Flush(tokio::sync::oneshot::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    /// Origin of the line, usually a provider id or `"parsed"`
    pub target: String,
    pub message: String,
    /// Local wall-clock time, `HH:MM:SS.mmm`
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        LogLine {
            level,
            target: target.into(),
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: impl Into<String>) -> Self {
        LogLine::new(Level::Info, PARSED_TARGET, message)
    }

    fn format(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}\n",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

/// Collects log lines for one run, in memory and optionally on disk.
#[derive(Clone)]
pub struct LogCollector {
    /// Sender to the disk persister; `None` for memory-only collectors
    tx: Option<Sender<LogMessage>>,
    log_path: Option<PathBuf>,
    session: Arc<Mutex<Vec<LogLine>>>,
    max_level: LevelFilter,
}

impl LogCollector {
    /// Create a collector that also persists every line under `log_dir`.
    ///
    /// The log file is created eagerly so a bad directory is reported here
    /// rather than silently dropped by the background thread.
    pub fn new(log_dir: &Path) -> Result<Self, String> {
        ensure_logs_dir_exists(log_dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{}_run.log", timestamp));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to create log file {}: {}", log_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        // Plain OS thread: independent of whichever tokio runtime the run uses.
        std::thread::spawn(move || {
            let mut file: File = file;
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let _ = file.write_all(line.format().as_bytes());
                    }
                    LogMessage::Flush(ack) => {
                        let _ = file.flush();
                        let _ = file.sync_data();
                        let _ = ack.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx: Some(tx),
            log_path: Some(log_path),
            session: Arc::new(Mutex::new(Vec::new())),
            max_level: LevelFilter::Info,
        })
    }

    /// Create a collector that keeps lines in memory only.
    pub fn in_memory() -> Self {
        LogCollector {
            tx: None,
            log_path: None,
            session: Arc::new(Mutex::new(Vec::new())),
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Path of the on-disk log, if this collector persists.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Record a line. Never blocks on disk I/O.
    pub fn log(&self, line: LogLine) {
        if line.level > self.max_level {
            return;
        }
        if let Some(ref tx) = self.tx {
            let _ = tx.send(LogMessage::Line(line.clone()));
        }
        if let Ok(mut session) = self.session.lock() {
            session.push(line);
        }
    }

    pub fn info(&self, target: &str, message: impl Into<String>) {
        self.log(LogLine::new(Level::Info, target, message));
    }

    pub fn warn(&self, target: &str, message: impl Into<String>) {
        self.log(LogLine::new(Level::Warn, target, message));
    }

    pub fn error(&self, target: &str, message: impl Into<String>) {
        self.log(LogLine::new(Level::Error, target, message));
    }

    /// Send a parsed (high-level) log
    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log(LogLine::parsed(message));
    }

    /// Snapshot of every line recorded so far, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.session
            .lock()
            .map(|session| session.clone())
            .unwrap_or_default()
    }

    /// Number of recorded lines at exactly `level`.
    pub fn count_at(&self, level: Level) -> usize {
        self.session
            .lock()
            .map(|session| session.iter().filter(|l| l.level == level).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.session.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every line sent before this call is on disk.
    ///
    /// Memory-only collectors return immediately.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let Some(ref tx) = self.tx else {
            return Ok(());
        };
        let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
        tx.send(LogMessage::Flush(ack_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        ack_rx
            .await
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Register a clone of this collector as the global `log` backend.
    pub fn init_global_logger(&self, level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(level);
        Ok(())
    }
}

/// Wires `log::info!()` and friends into the collector.
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            LogCollector::log(
                self,
                LogLine::new(record.level(), record.target(), record.args().to_string()),
            );
        }
    }

    fn flush(&self) {}
}

/// Ensure the logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))
}
