//! In-memory console logs
//!
//! A [`ConsoleBuffer`] is appended to by the job producing output and
//! read by any number of [`BufferConsole`] cursors. Readers waiting at
//! the end of an in-progress buffer are woken on every append and on
//! completion.

use crate::job::JobIdentifier;
use crate::resource::{ConsoleHandle, ConsoleLogSource, ResourceState};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct BufferState {
    lines: Vec<Vec<u8>>,
    complete: bool,
    open_handles: usize,
}

/// Append-only console log shared between one writer and many readers
#[derive(Debug, Default)]
pub struct ConsoleBuffer {
    state: Mutex<BufferState>,
    changed: Notify,
}

impl ConsoleBuffer {
    /// Create empty in-progress buffer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line; ignored once the buffer is complete
    pub fn append_line(&self, line: impl Into<Vec<u8>>) {
        {
            let mut state = self.state.lock();
            if state.complete {
                tracing::warn!("append to completed console buffer ignored");
                return;
            }
            state.lines.push(line.into());
        }
        self.changed.notify_waiters();
    }

    /// Mark the log as finished; readers drain and then see end of stream
    pub fn complete(&self) {
        self.state.lock().complete = true;
        self.changed.notify_waiters();
    }

    /// Whether the log is finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    /// Number of lines written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Whether nothing has been written yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().lines.is_empty()
    }

    /// Handles currently opened and not yet released
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }

    /// New reader starting at the first line
    #[must_use]
    pub fn console(self: &Arc<Self>) -> BufferConsole {
        BufferConsole::new(Some(Arc::clone(self)))
    }
}

/// One reader's cursor over a [`ConsoleBuffer`]
#[derive(Debug)]
pub struct BufferConsole {
    buffer: Option<Arc<ConsoleBuffer>>,
    cursor: usize,
    opened: bool,
}

impl BufferConsole {
    fn new(buffer: Option<Arc<ConsoleBuffer>>) -> Self {
        Self {
            buffer,
            cursor: 0,
            opened: false,
        }
    }

    /// Handle for a console that does not exist
    #[inline]
    #[must_use]
    pub fn missing() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ConsoleHandle for BufferConsole {
    async fn open(&mut self) -> io::Result<ResourceState> {
        let Some(buffer) = &self.buffer else {
            return Ok(ResourceState::Absent);
        };

        let mut state = buffer.state.lock();
        if !self.opened {
            state.open_handles += 1;
            self.opened = true;
        }
        Ok(if state.complete {
            ResourceState::Complete
        } else {
            ResourceState::InProgress
        })
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let buffer = match &self.buffer {
            Some(buffer) if self.opened => Arc::clone(buffer),
            _ => return Err(io::Error::other("console buffer not open")),
        };

        loop {
            // Register interest before checking, so an append between the
            // check and the await is not missed.
            let changed = buffer.changed.notified();
            {
                let state = buffer.state.lock();
                if let Some(line) = state.lines.get(self.cursor) {
                    self.cursor += 1;
                    return Ok(Some(line.clone()));
                }
                if state.complete {
                    return Ok(None);
                }
            }
            changed.await;
        }
    }

    fn release(&mut self) {
        if let (Some(buffer), true) = (&self.buffer, self.opened) {
            buffer.state.lock().open_handles -= 1;
            self.opened = false;
        }
    }
}

/// Console buffers registered by job
#[derive(Debug, Default)]
pub struct InMemoryLogSource {
    consoles: DashMap<JobIdentifier, Arc<ConsoleBuffer>>,
}

impl InMemoryLogSource {
    /// Create empty source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer for `job`, created if it does not exist yet
    #[must_use]
    pub fn create(&self, job: JobIdentifier) -> Arc<ConsoleBuffer> {
        Arc::clone(self.consoles.entry(job).or_default().value())
    }

    /// Existing buffer for `job`
    #[must_use]
    pub fn get(&self, job: &JobIdentifier) -> Option<Arc<ConsoleBuffer>> {
        self.consoles.get(job).map(|entry| Arc::clone(entry.value()))
    }

    /// Forget the buffer for `job`; open readers keep their copy
    pub fn remove(&self, job: &JobIdentifier) -> Option<Arc<ConsoleBuffer>> {
        self.consoles.remove(job).map(|(_, buffer)| buffer)
    }
}

impl ConsoleLogSource for InMemoryLogSource {
    fn console(&self, job: &JobIdentifier) -> Box<dyn ConsoleHandle> {
        Box::new(BufferConsole::new(self.get(job)))
    }
}
