//! Console streamer
//!
//! Copies a console log into a client sink line by line as it is
//! produced:
//!
//! ```text
//! Open ──Absent──────────────────────────────▶ NotFound
//!   │
//!   ▼
//! Streaming ──line──▶ write line + terminator ─┐
//!   ▲                                          │
//!   └──────────────────────────────────────────┘
//!   │ end of stream ─▶ Done
//!   │ cancelled ─────▶ Cancelled
//!   │ I/O error ─────▶ StreamError
//! ```
//!
//! The handle is released exactly once on every path, including when the
//! streaming future itself is dropped.

use crate::config::StreamerConfig;
use crate::error::StreamError;
use crate::job::JobIdentifier;
use crate::resource::{ConsoleHandle, ConsoleLogSource, ResourceState};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Terminal result of a streaming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// End of stream reached
    Done {
        /// Lines written to the sink
        lines: u64,
    },
    /// Console log does not exist; nothing was written
    NotFound,
    /// Caller stopped consuming
    Cancelled {
        /// Lines written before cancellation
        lines: u64,
    },
}

impl StreamOutcome {
    /// HTTP status matching this outcome
    ///
    /// A cancelled stream had already committed to 200 before the
    /// client went away.
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Done { .. } | Self::Cancelled { .. } => 200,
            Self::NotFound => 404,
        }
    }

    /// Lines written to the sink
    #[inline]
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        match self {
            Self::Done { lines } | Self::Cancelled { lines } => *lines,
            Self::NotFound => 0,
        }
    }
}

/// Releases the wrapped handle when dropped
struct ReleaseOnDrop<H: ConsoleHandle> {
    handle: H,
}

impl<H: ConsoleHandle> ReleaseOnDrop<H> {
    fn new(handle: H) -> Self {
        Self { handle }
    }
}

impl<H: ConsoleHandle> Drop for ReleaseOnDrop<H> {
    fn drop(&mut self) {
        self.handle.release();
        tracing::trace!("console handle released");
    }
}

/// Streams console logs to client sinks
#[derive(Debug, Clone, Default)]
pub struct ConsoleStreamer {
    config: StreamerConfig,
}

impl ConsoleStreamer {
    /// Create streamer with configuration
    #[inline]
    #[must_use]
    pub fn new(config: StreamerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Content type to declare on the response
    ///
    /// Log bytes are sent unchanged, so the charset should name the
    /// encoding the log was written in.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("text/plain; charset={}", self.config.charset)
    }

    /// Stream a fresh handle for `job` from `source`
    ///
    /// # Errors
    /// See [`ConsoleStreamer::stream`].
    pub async fn stream_job<S, W>(
        &self,
        source: &S,
        job: &JobIdentifier,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError>
    where
        S: ConsoleLogSource + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let outcome = self
            .stream(source.console(job), sink, cancel)
            .instrument(tracing::debug_span!("console", job = %job))
            .await;
        match &outcome {
            Ok(StreamOutcome::NotFound) => tracing::debug!(job = %job, "console log not found"),
            Ok(outcome) => tracing::debug!(
                job = %job,
                lines = outcome.lines_written(),
                ?outcome,
                "console stream finished"
            ),
            Err(e) => tracing::warn!(
                job = %job,
                lines = e.lines_written(),
                "console stream aborted: {}",
                e
            ),
        }
        outcome
    }

    /// Stream `handle` into `sink` until end of stream, absence, error or
    /// cancellation
    ///
    /// `NotFound` is decided before any byte is written, so the caller can
    /// still pick a 404 status. Output already written is not rolled back
    /// on later failure.
    ///
    /// # Errors
    /// - `StreamError::Open` if opening fails for a reason other than absence
    /// - `StreamError::Read` if reading a line fails
    /// - `StreamError::Write` if the sink rejects a line
    pub async fn stream<H, W>(
        &self,
        handle: H,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError>
    where
        H: ConsoleHandle,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut guard = ReleaseOnDrop::new(handle);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled { lines: 0 }),
            opened = guard.handle.open() => opened,
        };

        match opened {
            Ok(ResourceState::Absent) => return Ok(StreamOutcome::NotFound),
            Ok(state) => tracing::trace!(?state, "console opened"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StreamOutcome::NotFound),
            Err(e) => return Err(StreamError::Open(e)),
        }

        let mut lines: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled { lines }),
                next = guard.handle.next_line() => next,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(StreamOutcome::Done { lines }),
                // Log removed between open and first read: still nothing sent.
                Err(e) if e.kind() == io::ErrorKind::NotFound && lines == 0 => {
                    return Ok(StreamOutcome::NotFound)
                }
                Err(source) => return Err(StreamError::Read { lines, source }),
            };

            let written = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled { lines }),
                written = self.write_line(sink, line) => written,
            };
            written.map_err(|source| StreamError::Write { lines, source })?;
            lines += 1;
        }
    }

    async fn write_line<W>(&self, sink: &mut W, mut line: Vec<u8>) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        line.extend_from_slice(self.config.line_terminator.as_bytes());

        sink.write_all(&line).await?;
        if self.config.flush_each_line {
            sink.flush().await?;
        }
        Ok(())
    }
}
