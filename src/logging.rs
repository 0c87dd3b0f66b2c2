// src/logging.rs

//! Diagnostic sink handed to every extractor.
//!
//! Extraction code never logs through a global; it reports through the
//! `DebugSink` it was given. The binary passes a [`TracingSink`], tests pass a
//! [`NoopSink`] or a [`FnSink`] that records messages.

use tracing::Level;

pub trait DebugSink {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }
}

/// Forwards diagnostics to the `tracing` subscriber installed by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "route_scanner", "{message}"),
            Level::WARN => tracing::warn!(target: "route_scanner", "{message}"),
            Level::INFO => tracing::info!(target: "route_scanner", "{message}"),
            Level::DEBUG => tracing::debug!(target: "route_scanner", "{message}"),
            Level::TRACE => tracing::trace!(target: "route_scanner", "{message}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Adapts a caller-supplied callback.
pub struct FnSink<F>(pub F);

impl<F> DebugSink for FnSink<F>
where
    F: Fn(Level, &str),
{
    fn log(&self, level: Level, message: &str) {
        (self.0)(level, message)
    }
}
