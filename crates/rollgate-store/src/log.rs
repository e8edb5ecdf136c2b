//! Per-job execution logs.
//!
//! Each job owns one append-only log file, `<logs_dir>/<job_id>.log`, written
//! incrementally while the pipeline runs. Lines are timestamped on append and
//! never rewritten. Consumers (the API layer) read the file as-is.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

/// Directory holding all job log files.
#[derive(Debug, Clone)]
pub struct LogDir {
    root: PathBuf,
}

impl LogDir {
    /// Create the log directory if needed and return a handle to it.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The log file path for a given job id.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("{job_id}.log"))
    }

    /// Open the execution log for a job, creating the file if absent.
    pub fn open(&self, job_id: &str) -> ExecutionLog {
        ExecutionLog {
            path: self.path_for(job_id),
        }
    }
}

/// Append-only log for one job's pipeline run.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    path: PathBuf,
}

impl ExecutionLog {
    /// Open a log at an explicit path (tests, ad-hoc consumers).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    ///
    /// Log IO failure must never abort a deployment, so errors are reported
    /// via tracing and swallowed.
    pub fn append(&self, line: &str) {
        let stamped = format!(
            "[{}] {line}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(stamped.as_bytes()));
        if let Err(e) = result {
            warn!(path = ?self.path, error = %e, "failed to append to execution log");
        }
    }

    /// Read the whole log. Absent file reads as empty.
    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }
}
