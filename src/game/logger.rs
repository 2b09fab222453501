//! Engine logger with bump-allocated formatting
//!
//! Messages can go to stdout, to an in-memory buffer, or both. Formatting of
//! engine events happens in a reusable `bumpalo` arena so the common path
//! does not allocate intermediate strings.

use crate::core::{ManaPool, ObjectId};
use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt::{self, Write as FmtWrite};
use std::ops::Deref;

/// How much the engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityLevel {
    /// Nothing
    Silent = 0,
    /// Failures only
    Minimal = 1,
    /// Activations, payments and undo (default)
    #[default]
    Normal = 2,
    /// Solver detail
    Verbose = 3,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout (default)
    #[default]
    Stdout,
    /// Capture only to in-memory buffer (no stdout)
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// e.g. "activation", "auto_pay"
    pub category: Option<&'static str>,
}

/// Read-only view of captured entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl LogGuard<'_> {
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl Deref for LogGuard<'_> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

pub struct EngineLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,

    /// Scratch space for formatting; reset after each message
    format_bump: RefCell<Bump>,

    log_buffer: RefCell<Vec<LogEntry>>,
}

impl EngineLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        EngineLogger {
            verbosity,
            output_mode: OutputMode::default(),
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Capture to memory only (suppresses stdout)
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.borrow_mut().clear();
        self.format_bump.borrow_mut().reset();
    }

    /// Print buffered entries the verbosity allows, then clear the buffer
    pub fn flush_buffer(&mut self) {
        for entry in self.log_buffer.borrow().iter() {
            if entry.level <= self.verbosity {
                println!("{}", entry.message);
            }
        }
        self.clear_logs();
    }

    fn emit(&self, level: VerbosityLevel, category: Option<&'static str>, message: &str) {
        if level == VerbosityLevel::Silent {
            return;
        }
        let capture = self.is_capturing();
        let output = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both);

        if capture {
            self.log_buffer.borrow_mut().push(LogEntry {
                level,
                message: message.to_string(),
                category,
            });
        }
        if output && level <= self.verbosity {
            println!("{message}");
        }
    }

    fn wanted(&self, level: VerbosityLevel) -> bool {
        level != VerbosityLevel::Silent && (level <= self.verbosity || self.is_capturing())
    }

    /// Format into the arena and emit
    fn emit_fmt(&self, level: VerbosityLevel, category: Option<&'static str>, args: fmt::Arguments<'_>) {
        if !self.wanted(level) {
            return;
        }
        {
            let bump = self.format_bump.borrow();
            let mut text = bumpalo::collections::String::new_in(&bump);
            if text.write_fmt(args).is_ok() {
                self.emit(level, category, &text);
            }
        }
        self.format_bump.borrow_mut().reset();
    }

    pub fn minimal(&self, message: &str) {
        self.emit(VerbosityLevel::Minimal, None, message);
    }

    pub fn normal(&self, message: &str) {
        self.emit(VerbosityLevel::Normal, None, message);
    }

    pub fn verbose(&self, message: &str) {
        self.emit(VerbosityLevel::Verbose, None, message);
    }

    /// A source was activated
    pub fn activation(&self, card_name: &str, object_id: ObjectId, produced: &ManaPool) {
        self.emit_fmt(
            VerbosityLevel::Normal,
            Some("activation"),
            format_args!("{card_name} ({object_id}) adds {produced}"),
        );
    }

    /// An auto-pay run finished
    pub fn auto_pay(&self, cost: &str, taps: usize, remaining: &ManaPool) {
        self.emit_fmt(
            VerbosityLevel::Normal,
            Some("auto_pay"),
            format_args!("paid {cost} with {taps} tap(s), floating {remaining}"),
        );
    }

    pub fn auto_pay_failed(&self, cost: &str, unpaid: u32) {
        self.emit_fmt(
            VerbosityLevel::Minimal,
            Some("auto_pay"),
            format_args!("cannot pay {cost}: {unpaid} unpaid"),
        );
    }

    pub fn detail(&self, args: fmt::Arguments<'_>) {
        self.emit_fmt(VerbosityLevel::Verbose, Some("detail"), args);
    }
}

impl Default for EngineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

/// Clones carry settings, not captured entries
impl Clone for EngineLogger {
    fn clone(&self) -> Self {
        EngineLogger {
            verbosity: self.verbosity,
            output_mode: self.output_mode,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }
}

impl Serialize for EngineLogger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("EngineLogger", 2)?;
        state.serialize_field("verbosity", &self.verbosity)?;
        state.serialize_field("output_mode", &self.output_mode)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for EngineLogger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct EngineLoggerData {
            #[serde(default)]
            verbosity: VerbosityLevel,
            #[serde(default)]
            output_mode: OutputMode,
        }

        let data = EngineLoggerData::deserialize(deserializer)?;
        let mut logger = EngineLogger::with_verbosity(data.verbosity);
        logger.output_mode = data.output_mode;
        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creation() {
        let logger = EngineLogger::new();
        assert_eq!(logger.verbosity(), VerbosityLevel::Normal);
        assert!(!logger.is_capturing());
    }

    #[test]
    fn test_log_capture() {
        let mut logger = EngineLogger::new();
        logger.enable_capture();

        logger.normal("test message");
        logger.minimal("minimal message");

        let logs = logger.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "test message");
        assert_eq!(logs[1].level, VerbosityLevel::Minimal);
    }

    #[test]
    fn test_formatted_events() {
        let mut logger = EngineLogger::with_verbosity(VerbosityLevel::Silent);
        logger.enable_capture();

        let produced = ManaPool {
            colorless: 2,
            ..ManaPool::default()
        };
        logger.activation("Sol Ring", ObjectId::new(4), &produced);
        logger.auto_pay("{2}{G}", 2, &ManaPool::new());

        let logs = logger.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "Sol Ring (4) adds 2C");
        assert_eq!(logs[0].category, Some("activation"));
        assert_eq!(logs[1].message, "paid {2}{G} with 2 tap(s), floating empty");
    }

    #[test]
    fn test_flush_clears_buffer() {
        let mut logger = EngineLogger::new();
        logger.enable_capture();
        logger.normal("one");
        logger.verbose("two");
        assert_eq!(logger.logs().len(), 2);

        logger.flush_buffer();
        assert!(logger.logs().is_empty());
    }

    #[test]
    fn test_verbosity_serde_names() {
        let json = serde_json::to_string(&VerbosityLevel::Verbose).unwrap();
        assert_eq!(json, "\"verbose\"");
        let logger: EngineLogger = serde_json::from_str(r#"{"verbosity": "minimal"}"#).unwrap();
        assert_eq!(logger.verbosity(), VerbosityLevel::Minimal);
    }
}
