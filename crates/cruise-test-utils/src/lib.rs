//! Testing utilities for Cruise workspace
//!
//! Shared test doubles, fixtures, and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use cruise_config::{ConfigurationSnapshot, EnvironmentDefinition};
use cruise_console::{ConsoleHandle, ResourceState};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `{CI: [p1, p2]}` against pipelines `{p1, p3}`
pub fn ci_snapshot() -> ConfigurationSnapshot {
    ConfigurationSnapshot::new(["p1", "p3"])
        .with_environment(EnvironmentDefinition::new("CI").with_pipelines(["p1", "p2"]))
}

/// Snapshot where every environment reference resolves
pub fn consistent_snapshot() -> ConfigurationSnapshot {
    ConfigurationSnapshot::new(["build", "test", "deploy"])
        .with_environment(EnvironmentDefinition::new("dev").with_pipelines(["build", "test"]))
        .with_environment(EnvironmentDefinition::new("prod").with_pipeline("deploy"))
        .with_environment(EnvironmentDefinition::new("empty"))
}

/// Shared count of `release` calls
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
enum Step {
    Line(Vec<u8>),
    Fail(io::ErrorKind),
    Stall,
}

#[derive(Debug, Clone, Copy)]
enum OpenScript {
    State(ResourceState),
    Fail(io::ErrorKind),
}

/// Scripted console handle that counts releases
#[derive(Debug)]
pub struct CountingConsole {
    open: OpenScript,
    steps: VecDeque<Step>,
    released: ReleaseCounter,
}

impl CountingConsole {
    /// Complete log with the given lines
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            open: OpenScript::State(ResourceState::Complete),
            steps: lines.into_iter().map(|l| Step::Line(l.into())).collect(),
            released: ReleaseCounter::default(),
        }
    }

    /// Log that does not exist
    pub fn absent() -> Self {
        Self {
            open: OpenScript::State(ResourceState::Absent),
            ..Self::with_lines(Vec::<Vec<u8>>::new())
        }
    }

    /// Log whose `open` fails with `kind`
    pub fn failing_open(kind: io::ErrorKind) -> Self {
        Self {
            open: OpenScript::Fail(kind),
            ..Self::with_lines(Vec::<Vec<u8>>::new())
        }
    }

    /// Report `InProgress` on open
    #[must_use]
    pub fn in_progress(mut self) -> Self {
        self.open = OpenScript::State(ResourceState::InProgress);
        self
    }

    /// After the scripted lines, fail the next read with `kind`
    #[must_use]
    pub fn then_fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    /// After the scripted lines, wait forever for more content
    #[must_use]
    pub fn then_stall(mut self) -> Self {
        self.steps.push_back(Step::Stall);
        self
    }

    /// Counter shared with this handle
    pub fn release_counter(&self) -> ReleaseCounter {
        self.released.clone()
    }
}

#[async_trait]
impl ConsoleHandle for CountingConsole {
    async fn open(&mut self) -> io::Result<ResourceState> {
        match self.open {
            OpenScript::State(state) => Ok(state),
            OpenScript::Fail(kind) => Err(io::Error::new(kind, "scripted open failure")),
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.steps.pop_front() {
            Some(Step::Line(line)) => Ok(Some(line)),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            Some(Step::Stall) => std::future::pending().await,
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.released.bump();
    }
}

/// Sink accepting a fixed number of writes, then failing like a closed connection
#[derive(Debug, Default)]
pub struct FailingSink {
    written: Vec<u8>,
    remaining_writes: usize,
}

impl FailingSink {
    pub fn after_writes(writes: usize) -> Self {
        Self {
            written: Vec::new(),
            remaining_writes: writes,
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.remaining_writes == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "client went away",
            )));
        }
        this.remaining_writes -= 1;
        this.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
