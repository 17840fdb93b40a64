//! Job coordinates that key a console log

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of one job run: pipeline/counter/stage/counter/job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentifier {
    /// Pipeline name
    pub pipeline: String,
    /// Pipeline run counter
    pub pipeline_counter: u64,
    /// Stage name
    pub stage: String,
    /// Stage run counter
    pub stage_counter: u64,
    /// Job name
    pub job: String,
}

impl JobIdentifier {
    /// Create job identifier
    #[must_use]
    pub fn new(
        pipeline: impl Into<String>,
        pipeline_counter: u64,
        stage: impl Into<String>,
        stage_counter: u64,
        job: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            pipeline_counter,
            stage: stage.into(),
            stage_counter,
            job: job.into(),
        }
    }

    /// Directory holding this job's artifacts under `root`
    #[must_use]
    pub fn directory_under(&self, root: &Path) -> PathBuf {
        root.join(&self.pipeline)
            .join(self.pipeline_counter.to_string())
            .join(&self.stage)
            .join(self.stage_counter.to_string())
            .join(&self.job)
    }
}

impl fmt::Display for JobIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.pipeline, self.pipeline_counter, self.stage, self.stage_counter, self.job
        )
    }
}
