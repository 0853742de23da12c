//! Progress and log event plumbing
//!
//! The driver reports through two narrow callbacks so the core stays
//! headless-testable. A timestamped side log in the output directory
//! receives every message; the [`LogLevel`] filter applies only to the
//! callback.
//!
//! Message severity rides on the emoji prefix convention:
//! `✔ 📦 🧭 🗃️ 📁` info, `⏭️` skip, `⚠️` warning, `❌ 💥` error,
//! `✅` completion.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::options::LogLevel;

/// Message severity derived from the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Skip,
    Warning,
    Error,
    Completion,
}

/// Classify a message by its prefix.
pub fn severity_of(message: &str) -> Severity {
    if message.starts_with('❌') || message.starts_with('💥') {
        Severity::Error
    } else if message.starts_with("⚠️") {
        Severity::Warning
    } else if message.starts_with("⏭️") {
        Severity::Skip
    } else if message.starts_with('✅') {
        Severity::Completion
    } else {
        Severity::Info
    }
}

fn passes(level: LogLevel, severity: Severity) -> bool {
    match level {
        LogLevel::Full => true,
        LogLevel::Warnings => matches!(
            severity,
            Severity::Warning | Severity::Error | Severity::Completion
        ),
        LogLevel::Error => matches!(severity, Severity::Error | Severity::Completion),
        LogLevel::Minimal => matches!(severity, Severity::Completion),
        LogLevel::Silent | LogLevel::None => false,
    }
}

type ProgressFn = Box<dyn Fn(f64) + Send>;
type LogFn = Box<dyn Fn(&str) + Send>;

/// Sink for a run's user-facing events.
pub struct EventSink {
    level: LogLevel,
    progress: Option<ProgressFn>,
    log: Option<LogFn>,
    file: Option<BufWriter<File>>,
}

impl EventSink {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            progress: None,
            log: None,
            file: None,
        }
    }

    pub fn set_progress(&mut self, callback: impl Fn(f64) + Send + 'static) {
        self.progress = Some(Box::new(callback));
    }

    pub fn set_log(&mut self, callback: impl Fn(&str) + Send + 'static) {
        self.log = Some(Box::new(callback));
    }

    /// Open the per-run side log (`extract_log_YYYYMMDD_HHmmss.log`).
    pub fn open_side_log(&mut self, output_dir: &Path) -> io::Result<PathBuf> {
        let name = format!("extract_log_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let path = output_dir.join(name);
        self.file = Some(BufWriter::new(File::create(&path)?));
        Ok(path)
    }

    /// Advisory progress, 0 to 100.
    pub fn progress(&self, percent: f64) {
        if let Some(callback) = &self.progress {
            callback(percent);
        }
    }

    /// Record a message: always to the side log, to the callback when
    /// the level admits its severity.
    pub fn log(&mut self, message: &str) {
        if let Some(writer) = &mut self.file {
            let _ = writeln!(writer, "{message}");
        }
        if let Some(callback) = &self.log
            && passes(self.level, severity_of(message))
        {
            callback(message);
        }
    }

    /// Flush the side log at the end of a run.
    pub fn finish(&mut self) {
        if let Some(writer) = &mut self.file {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_sink(level: LogLevel) -> (EventSink, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = Arc::clone(&seen);
        let mut sink = EventSink::new(level);
        sink.set_log(move |m| seen_in.lock().unwrap().push(m.to_string()));
        (sink, seen)
    }

    #[test]
    fn test_severity_prefixes() {
        assert_eq!(severity_of("✔ wrote file"), Severity::Info);
        assert_eq!(severity_of("📦 starting"), Severity::Info);
        assert_eq!(severity_of("⏭️ Skipping (Config): a.ini"), Severity::Skip);
        assert_eq!(severity_of("⚠️ bad entry"), Severity::Warning);
        assert_eq!(severity_of("❌ broken"), Severity::Error);
        assert_eq!(severity_of("💥 fatal"), Severity::Error);
        assert_eq!(severity_of("✅ Done"), Severity::Completion);
    }

    #[test]
    fn test_level_filters_callback() {
        let messages = ["✔ info", "⏭️ skip", "⚠️ warn", "❌ error", "✅ done"];

        let expectations = [
            (LogLevel::Full, 5),
            (LogLevel::Warnings, 3),
            (LogLevel::Error, 2),
            (LogLevel::Minimal, 1),
            (LogLevel::Silent, 0),
            (LogLevel::None, 0),
        ];
        for (level, expected) in expectations {
            let (mut sink, seen) = collecting_sink(level);
            for m in &messages {
                sink.log(m);
            }
            assert_eq!(seen.lock().unwrap().len(), expected, "level {level:?}");
        }
    }

    #[test]
    fn test_side_log_receives_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = EventSink::new(LogLevel::Silent);
        let path = sink.open_side_log(dir.path()).expect("open side log");
        assert!(
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("extract_log_") && n.ends_with(".log"))
        );

        sink.log("✔ one");
        sink.log("⚠️ two");
        sink.finish();

        let contents = std::fs::read_to_string(&path).expect("read side log");
        assert_eq!(contents.lines().count(), 2);
    }
}
