//! Console log resources
//!
//! A [`ConsoleHandle`] is one reader's scoped view of a console log. Each
//! handle carries its own cursor, so several clients can tail the same log
//! without interfering. Handles are handed out by a [`ConsoleLogSource`].

use crate::job::JobIdentifier;
use async_trait::async_trait;
use std::io;

/// State of a console log as reported by its owner
///
/// Keeps "does not exist" apart from "exists but nothing written yet",
/// so an in-progress log with no output is never reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// No log exists for the job
    Absent,
    /// Log exists and is still being appended to
    InProgress,
    /// Log exists and will not grow any further
    Complete,
}

impl ResourceState {
    /// Whether the log exists
    #[inline]
    #[must_use]
    pub fn exists(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Per-request handle on a console log
#[async_trait]
pub trait ConsoleHandle: Send {
    /// Acquire the underlying log and report its state
    ///
    /// An `io::ErrorKind::NotFound` error is treated like `Absent`.
    async fn open(&mut self) -> io::Result<ResourceState>;

    /// Next line's bytes without the terminator, or `None` at end of stream
    ///
    /// Bytes are passed through as written, whatever their encoding. For
    /// in-progress logs this waits for more content. The returned future
    /// must be safe to drop at any await point.
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Release whatever `open` acquired
    ///
    /// Called exactly once per streaming call, whether or not `open`
    /// succeeded.
    fn release(&mut self);
}

#[async_trait]
impl<H: ConsoleHandle + ?Sized> ConsoleHandle for Box<H> {
    async fn open(&mut self) -> io::Result<ResourceState> {
        (**self).open().await
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        (**self).next_line().await
    }

    fn release(&mut self) {
        (**self).release();
    }
}

/// Hands out fresh console handles keyed by job
pub trait ConsoleLogSource: Send + Sync {
    /// New handle with its own cursor for the job's console
    fn console(&self, job: &JobIdentifier) -> Box<dyn ConsoleHandle>;
}
