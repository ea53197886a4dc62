//! Progress reporting

/// Receives progress text while the gate works
pub trait ProgressReporter: Send + Sync {
    /// Main line, e.g. the current phase
    fn set_text(&self, text: &str);

    /// Secondary line, e.g. the repository being processed
    fn set_detail(&self, text: &str);
}

/// Reports progress as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn set_text(&self, text: &str) {
        tracing::info!("{}", text);
    }

    fn set_detail(&self, text: &str) {
        tracing::debug!("{}", text);
    }
}
