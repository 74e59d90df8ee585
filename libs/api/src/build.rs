//! Build and signal protocol frames.
//!
//! A build's response stream is newline-delimited JSON: exactly one
//! [`BuildStarted`] frame, then [`StatusUpdate`] frames until a
//! terminal one. `StatusUpdate` is an enum, so a frame carries exactly
//! one of job-finished / build-failed / build-finished.

use quarry_graph::Graph;
use quarry_id::{BuildId, FileId, JobId};
use serde::{Deserialize, Serialize};

/// Request body of `POST /build`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub graph: Graph,
}

/// First frame on every build stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStarted {
    /// Coordinator-minted ID for this build, used to address signals.
    pub id: BuildId,

    /// Source files the coordinator does not have; the client must
    /// upload these before signalling upload-done.
    #[serde(default)]
    pub missing_files: Vec<FileId>,
}

/// One status frame after the started frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusUpdate {
    /// A job completed (successfully or not).
    JobFinished(JobResult),

    /// The build failed; terminal.
    BuildFailed(BuildFailed),

    /// All jobs completed; terminal.
    BuildFinished(BuildFinished),
}

impl StatusUpdate {
    /// Whether this frame ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusUpdate::BuildFailed(_) | StatusUpdate::BuildFinished(_)
        )
    }
}

/// Terminal failure frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildFailed {
    pub error: String,
}

/// Terminal success frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildFinished {}

/// Outcome of one job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: JobId,

    pub exit_code: i32,

    #[serde(default, with = "crate::bytes")]
    pub stdout: Vec<u8>,

    #[serde(default, with = "crate::bytes")]
    pub stderr: Vec<u8>,

    /// Empty on success; staging or spawn failures land here.
    #[serde(default)]
    pub error: String,
}

impl JobResult {
    /// A result for a job that never ran a command to completion.
    pub fn failed(id: JobId, error: impl Into<String>) -> Self {
        Self {
            id,
            exit_code: -1,
            stdout: Vec::new(),
            stderr: Vec::new(),
            error: error.into(),
        }
    }
}

/// Body of `POST /signal?build_id=`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_done: Option<UploadDone>,
}

/// Signals that every missing source file has been uploaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadDone {}

/// Response body of `POST /signal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_carries_exactly_one_variant() {
        let update = StatusUpdate::JobFinished(JobResult {
            id: JobId::from_content(b"compile"),
            exit_code: 0,
            stdout: b"ok\n".to_vec(),
            stderr: Vec::new(),
            error: String::new(),
        });

        let json = serde_json::to_value(&update).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("job_finished"));
    }

    #[test]
    fn test_stdout_is_base64_on_the_wire() {
        let update = StatusUpdate::JobFinished(JobResult {
            id: JobId::from_content(b"compile"),
            exit_code: 0,
            stdout: b"hello".to_vec(),
            stderr: Vec::new(),
            error: String::new(),
        });

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("aGVsbG8="));

        let back: StatusUpdate = serde_json::from_str(&json).unwrap();
        let StatusUpdate::JobFinished(result) = back else {
            panic!("wrong variant");
        };
        assert_eq!(result.stdout, b"hello");
    }

    #[test]
    fn test_terminal_frames() {
        assert!(StatusUpdate::BuildFinished(BuildFinished {}).is_terminal());
        assert!(StatusUpdate::BuildFailed(BuildFailed {
            error: "boom".into()
        })
        .is_terminal());
        assert!(!StatusUpdate::JobFinished(JobResult::failed(
            JobId::from_content(b"j"),
            "staging failed"
        ))
        .is_terminal());
    }

    #[test]
    fn test_build_started_roundtrip() {
        let started = BuildStarted {
            id: BuildId::random(),
            missing_files: vec![FileId::from_content(b"main.c")],
        };
        let json = serde_json::to_string(&started).unwrap();
        let back: BuildStarted = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, started.id);
        assert_eq!(back.missing_files, started.missing_files);
    }
}
