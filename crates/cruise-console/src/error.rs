//! Error types for console streaming
//!
//! A missing log is not an error: it is reported as
//! [`StreamOutcome::NotFound`](crate::StreamOutcome::NotFound).
//! Everything here is an unexpected I/O failure, propagated after the
//! console handle has been released.

use std::io;

/// Streaming I/O failure
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Opening the console failed for a reason other than absence
    #[error("failed to open console: {0}")]
    Open(#[source] io::Error),

    /// Reading the next line failed
    #[error("failed to read console after {lines} lines: {source}")]
    Read {
        /// Lines already delivered to the sink
        lines: u64,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Writing to the sink failed
    #[error("failed to write console after {lines} lines: {source}")]
    Write {
        /// Lines already delivered to the sink
        lines: u64,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    /// Lines fully written before the failure
    #[inline]
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        match self {
            Self::Open(_) => 0,
            Self::Read { lines, .. } | Self::Write { lines, .. } => *lines,
        }
    }

    /// Underlying I/O error
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Open(source) | Self::Read { source, .. } | Self::Write { source, .. } => source,
        }
    }

    /// Status the HTTP layer should use if nothing was written yet
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        500
    }

    /// Whether this layer retries (it never does; the caller may)
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}
