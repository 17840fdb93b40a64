//! Streamer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Console streaming configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Charset declared in the content type
    pub charset: String,
    /// Terminator written after every line
    pub line_terminator: String,
    /// Flush the sink after every line so tailing clients see it promptly
    pub flush_each_line: bool,
    /// How often file-backed in-progress logs are polled for new content
    pub poll_interval_ms: u64,
}

impl StreamerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With charset
    #[inline]
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// With line terminator
    #[inline]
    #[must_use]
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// With per-line flushing on or off
    #[inline]
    #[must_use]
    pub fn with_flush_each_line(mut self, flush: bool) -> Self {
        self.flush_each_line = flush;
        self
    }

    /// With poll interval for in-progress file logs
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Poll interval as a `Duration`
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            charset: "utf-8".to_string(),
            line_terminator: "\n".to_string(),
            flush_each_line: true,
            poll_interval_ms: 250,
        }
    }
}
