use anyhow::{anyhow, Context, Result};
use chrono::{Local, Utc};
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::{Config, LoggingConfig};
use crate::constants::LOG_BUFFER_CAPACITY;

static GLOBAL: OnceCell<Logger> = OnceCell::new();

/// Shared logger that can be used across the application.
///
/// Keeps the most recent lines in memory for status views. When installed
/// with [`Logger::init`] it also becomes the `log` backend, optionally
/// writing to a file.
#[derive(Clone)]
pub struct Logger {
    logs: Arc<Mutex<VecDeque<String>>>,
    enabled: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(VecDeque::with_capacity(LOG_BUFFER_CAPACITY))),
            enabled: false,
        }
    }

    /// Install the global `log` backend. Calling it again returns the
    /// logger installed first.
    pub fn init(config: &LoggingConfig) -> Result<Logger> {
        GLOBAL
            .get_or_try_init(|| {
                let logger = Logger {
                    enabled: config.enabled,
                    ..Logger::new()
                };
                logger.install(config)?;
                Ok::<_, anyhow::Error>(logger)
            })
            .cloned()
    }

    /// The logger installed by [`Logger::init`], if any.
    pub fn global() -> Option<&'static Logger> {
        GLOBAL.get()
    }

    fn install(&self, config: &LoggingConfig) -> Result<()> {
        let buffer = self.clone();
        let mut dispatch = fern::Dispatch::new()
            .level(config.level_filter()?)
            .level_for("sqlx", log::LevelFilter::Warn)
            .level_for("sea_orm", log::LevelFilter::Warn)
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {:<5} {}] {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(fern::Output::call(move |record| buffer.push(record.args().to_string())));

        if config.enabled {
            let path = Self::get_log_file_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file = fern::log_file(&path).with_context(|| format!("Failed to open log file: {}", path.display()))?;
            dispatch = dispatch.chain(file);
        }

        dispatch
            .apply()
            .map_err(|e| anyhow!("Failed to install logger: {}", e))
    }

    /// Path of the log file written when logging is enabled.
    pub fn get_log_file_path() -> Result<PathBuf> {
        Ok(Config::get_data_dir()?.join("tasklane.log"))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add a log entry
    pub fn log(&self, message: String) {
        let timestamp = Utc::now().format("%H:%M:%S%.3f").to_string();
        self.push(format!("[{}] {}", timestamp, message));
    }

    fn push(&self, line: String) {
        if let Ok(mut logs) = self.logs.lock() {
            if logs.len() == LOG_BUFFER_CAPACITY {
                logs.pop_front();
            }
            logs.push_back(line);
        }
    }

    /// Get all logs sorted by date (newest first)
    pub fn get_logs(&self) -> Vec<String> {
        if let Ok(logs) = self.logs.lock() {
            logs.iter().rev().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Clear all logs
    pub fn clear(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
