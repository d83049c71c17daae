//! Logging configuration
//!
//! Only describes *where* and *how much* to log. The subscriber itself is
//! installed by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

const LOG_FILE_PREFIX: &str = "usbdmx";

/// Logging settings, persisted as part of the user configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
    /// Directory that receives log files
    pub log_path: PathBuf,
    /// How many log files to keep when cleaning up
    pub max_files: usize,
    /// Write log lines to stderr
    pub console_output: bool,
    /// Write log lines to a file in `log_path`
    pub file_output: bool,
    #[serde(skip)]
    session_stamp: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        let log_path = dirs::data_local_dir()
            .map(|p| p.join("usbdmx").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));

        Self {
            level: "info".to_string(),
            log_path,
            max_files: 10,
            console_output: true,
            file_output: false,
            session_stamp: None,
        }
    }
}

impl LogConfig {
    /// Create a config that logs to `log_path`
    pub fn with_path(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            ..Default::default()
        }
    }

    /// Parse `level`, falling back to INFO for anything unknown
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }

    /// Create `log_path` if it does not exist
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_path)?;
        }
        Ok(())
    }

    /// Path of the log file for the current session.
    ///
    /// Stable once [`LogConfig::start_session`] has been called; before that
    /// every call stamps the current time.
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = self
            .session_stamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
        self.log_path
            .join(format!("{}_{}.log", LOG_FILE_PREFIX, stamp))
    }

    /// Pin the session timestamp so that every later `current_log_path` agrees
    pub fn start_session(&mut self) {
        self.session_stamp = Some(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain
    /// before the current session writes its own.
    pub fn cleanup_old_logs(&self) -> std::io::Result<usize> {
        if !self.log_path.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "log")
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
            })
            .collect();

        let keep = self.max_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort chronologically.
        logs.sort();
        let excess = logs.len() - keep;
        let mut removed = 0;
        for path in logs.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove old log {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}
