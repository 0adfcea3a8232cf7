use std::borrow::Cow;

use anyhow::{Error, Result};
use parking_lot::Mutex;

/// Turns an error into the text shown to whoever is watching the session.
pub trait ErrorFormatter: Send + Sync {
    /// Render the error for display.
    fn format_error(&self, error: &Error) -> Cow<'_, str>;
}

/// Sink for non-fatal errors that were recovered from but should not vanish.
///
/// Callback handlers that answer the agent with a default value hand the
/// underlying fault to a reporter instead of dropping it.
pub trait ErrorReporter: Send + Sync {
    /// Record the error.
    fn capture(&self, error: &Error) -> Result<()>;
}

/// Emits each captured error as a `tracing` warning with its cause chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn capture(&self, error: &Error) -> Result<()> {
        tracing::warn!(error = %format!("{error:#}"), "recovered error captured");
        Ok(())
    }
}

/// Keeps captured errors in memory, rendered with their cause chain.
#[derive(Debug, Default)]
pub struct MemoryErrorReporter {
    captured: Mutex<Vec<String>>,
}

impl MemoryErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages captured so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.captured.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.lock().is_empty()
    }
}

impl ErrorReporter for MemoryErrorReporter {
    fn capture(&self, error: &Error) -> Result<()> {
        self.captured.lock().push(format!("{error:#}"));
        Ok(())
    }
}

/// Joins the error and every cause with `: `.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChainErrorFormatter;

impl ErrorFormatter for ChainErrorFormatter {
    fn format_error(&self, error: &Error) -> Cow<'_, str> {
        Cow::Owned(format!("{error:#}"))
    }
}
