//! Centralized logging configuration for the generator.
//!
//! # Architecture
//!
//! - **LogConfig**: global configuration stored in atomics
//! - **LogLevel**: hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: one category per generator stage
//! - **log()**: common logging function with lazy message construction
//!
//! Output goes to stderr unless a log file is configured, so the generated
//! suite on stdout is never interleaved with diagnostics.
//!
//! # Usage
//!
//! ```rust
//! use testgen_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Synth, LogLevel::Debug, || {
//!     format!("synthesized {} units for {}", 12, "LDA")
//! });
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category, one per generator stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Addressing-mode template lookups
    Catalog,
    /// Instruction table validation and selection
    Table,
    /// Test-case cross products
    Expander,
    /// Test unit synthesis and semantics evaluation
    Synth,
    /// Suite text rendering
    Emitter,
}

impl LogCategory {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            LogCategory::Catalog => 0,
            LogCategory::Table => 1,
            LogCategory::Expander => 2,
            LogCategory::Synth => 3,
            LogCategory::Emitter => 4,
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Applies to every category without its own level
    global_level: AtomicU8,
    /// Per-category overrides, `Off` means "use the global level"
    category_levels: [AtomicU8; LogCategory::COUNT],
    /// Destination file; stderr when unset
    log_file: Mutex<Option<File>>,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: std::array::from_fn(|_| AtomicU8::new(LogLevel::Off as u8)),
            log_file: Mutex::new(None),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// Check if a message should be logged for the given category and level
    ///
    /// A category with its own level uses it; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for level in &self.category_levels {
            level.store(LogLevel::Off as u8, Ordering::Relaxed);
        }
    }

    /// Append log output to `path` instead of stderr.
    pub fn set_log_file(&self, path: &Path) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if let Ok(mut slot) = self.log_file.lock() {
            *slot = Some(file);
        }
        Ok(())
    }

    /// Go back to logging on stderr
    pub fn clear_log_file(&self) {
        if let Ok(mut slot) = self.log_file.lock() {
            *slot = None;
        }
    }

    fn write_message(&self, message: &str) {
        if let Ok(mut slot) = self.log_file.lock() {
            if let Some(file) = slot.as_mut() {
                // Logging never fails generation; fall back to stderr.
                if writeln!(file, "{}", message).is_ok() {
                    return;
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level
///
/// The message closure only runs when the category/level pair is enabled.
///
/// # Examples
///
/// ```rust
/// use testgen_core::logging::{log, LogCategory, LogLevel};
///
/// log(LogCategory::Table, LogLevel::Info, || "validated 53 instructions".to_string());
/// ```
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        let message = format!("[{:?}] {}", category, message_fn());
        config.write_message(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("verbose"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Synth, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Synth, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Synth, LogLevel::Trace));
        assert!(!config.should_log(LogCategory::Emitter, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Emitter, LogLevel::Error));
    }

    #[test]
    fn test_off_is_never_logged() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::Table, LogLevel::Off));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Catalog, LogLevel::Info);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Catalog), LogLevel::Off);
    }
}
