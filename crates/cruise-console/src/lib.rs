//! Cruise Console
//!
//! Serves job console logs to clients while they are being produced.
//!
//! # Overview
//!
//! - **ConsoleHandle**: per-request handle with its own read cursor
//! - **ConsoleLogSource**: hands out handles keyed by [`JobIdentifier`]
//! - **ConsoleStreamer**: copies lines to a sink, maps a missing log to
//!   `NotFound`, and always releases the handle
//!
//! Two sources are provided: [`FileLogSource`] for logs on disk and
//! [`InMemoryLogSource`] for logs held in memory.
//!
//! # Example
//!
//! ```rust
//! use cruise_console::{ConsoleStreamer, InMemoryLogSource, JobIdentifier, StreamOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), cruise_console::StreamError> {
//! let source = InMemoryLogSource::new();
//! let job = JobIdentifier::new("build", 1, "test", 1, "unit");
//! let log = source.create(job.clone());
//! log.append_line("build started");
//! log.append_line("build passed");
//! log.complete();
//!
//! let mut body = Vec::new();
//! let outcome = ConsoleStreamer::default()
//!     .stream_job(&source, &job, &mut body, &CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
//! assert_eq!(body, b"build started\nbuild passed\n");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod file;
pub mod job;
pub mod memory;
pub mod resource;
pub mod streamer;

// Re-exports
pub use config::StreamerConfig;
pub use error::StreamError;
pub use file::{FileConsole, FileLogSource};
pub use job::JobIdentifier;
pub use memory::{BufferConsole, ConsoleBuffer, InMemoryLogSource};
pub use resource::{ConsoleHandle, ConsoleLogSource, ResourceState};
pub use streamer::{ConsoleStreamer, StreamOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for console streaming
    pub use crate::{
        ConsoleHandle, ConsoleLogSource, ConsoleStreamer, JobIdentifier, ResourceState,
        StreamError, StreamOutcome, StreamerConfig,
    };
    pub use tokio_util::sync::CancellationToken;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
