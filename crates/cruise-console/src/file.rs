//! File-backed console logs
//!
//! Layout: `<root>/<pipeline>/<counter>/<stage>/<counter>/<job>/console.log`.
//! While a job is still running its agent keeps a `console.log.inprogress`
//! marker next to the log; readers poll for new content until the marker
//! is gone.

use crate::config::StreamerConfig;
use crate::job::JobIdentifier;
use crate::resource::{ConsoleHandle, ConsoleLogSource, ResourceState};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// File name of a job's console log
pub const CONSOLE_LOG_FILE: &str = "console.log";

/// Marker present while a console log is still being written
pub const IN_PROGRESS_MARKER: &str = "console.log.inprogress";

/// Console logs stored under a directory tree
#[derive(Debug, Clone)]
pub struct FileLogSource {
    root: PathBuf,
    poll_interval: Duration,
}

impl FileLogSource {
    /// Create source rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: StreamerConfig::default().poll_interval(),
        }
    }

    /// Create source using the poll interval from `config`
    #[must_use]
    pub fn from_config(root: impl Into<PathBuf>, config: &StreamerConfig) -> Self {
        Self::new(root).with_poll_interval(config.poll_interval())
    }

    /// With poll interval for in-progress logs
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the console log for `job`
    #[must_use]
    pub fn console_path(&self, job: &JobIdentifier) -> PathBuf {
        job.directory_under(&self.root).join(CONSOLE_LOG_FILE)
    }
}

impl ConsoleLogSource for FileLogSource {
    fn console(&self, job: &JobIdentifier) -> Box<dyn ConsoleHandle> {
        Box::new(FileConsole::new(self.console_path(job)).with_poll_interval(self.poll_interval))
    }
}

/// One reader's handle on a console log file
///
/// Lines are returned as raw bytes. A line is only handed out once its
/// newline has arrived (or the log is complete), so a multi-byte character
/// split across two appends is never cut in half.
#[derive(Debug)]
pub struct FileConsole {
    path: PathBuf,
    marker: PathBuf,
    poll_interval: Duration,
    reader: Option<BufReader<File>>,
    opened: bool,
    pending: Vec<u8>,
    finished: bool,
}

impl FileConsole {
    /// Create handle for the log at `path`; nothing is opened yet
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let marker = path.with_file_name(IN_PROGRESS_MARKER);
        Self {
            path,
            marker,
            poll_interval: StreamerConfig::default().poll_interval(),
            reader: None,
            opened: false,
            pending: Vec::new(),
            finished: false,
        }
    }

    /// With poll interval for in-progress logs
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Log file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is currently open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    async fn in_progress(&self) -> io::Result<bool> {
        tokio::fs::try_exists(&self.marker).await
    }

    /// Open the log file if it exists by now
    async fn try_attach(&mut self) -> io::Result<bool> {
        match File::open(&self.path).await {
            Ok(file) => {
                self.reader = Some(BufReader::new(file));
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn take_pending(&mut self) -> Vec<u8> {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        line
    }
}

#[async_trait]
impl ConsoleHandle for FileConsole {
    async fn open(&mut self) -> io::Result<ResourceState> {
        let attached = self.try_attach().await?;
        // The agent may drop its marker before the first byte of output.
        let in_progress = self.in_progress().await?;
        if !attached && !in_progress {
            return Ok(ResourceState::Absent);
        }
        self.opened = true;

        if in_progress {
            Ok(ResourceState::InProgress)
        } else {
            self.finished = true;
            Ok(ResourceState::Complete)
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if !self.opened {
            return Err(io::Error::other("console log not open"));
        }

        loop {
            if self.reader.is_none() && !self.try_attach().await? {
                if self.in_progress().await? {
                    tokio::time::sleep(self.poll_interval).await;
                } else if self.finished {
                    // Job finished without ever writing a log.
                    return Ok(None);
                } else {
                    self.finished = true;
                }
                continue;
            }

            let reader = self
                .reader
                .as_mut()
                .ok_or_else(|| io::Error::other("console log not open"))?;

            let read = reader.read_until(b'\n', &mut self.pending).await?;
            if self.pending.last() == Some(&b'\n') {
                return Ok(Some(self.take_pending()));
            }
            if read > 0 {
                continue;
            }

            if !self.finished {
                if self.in_progress().await? {
                    tokio::time::sleep(self.poll_interval).await;
                } else {
                    // One more pass picks up output written just before completion.
                    self.finished = true;
                }
                continue;
            }

            return Ok(if self.pending.is_empty() {
                None
            } else {
                Some(self.take_pending())
            });
        }
    }

    fn release(&mut self) {
        self.reader = None;
        self.opened = false;
        self.pending.clear();
    }
}
