//! Task records as stored and as returned to clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upload extensions the converter accepts, lowercase with the leading dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".docx", ".pdf", ".pptx", ".doc", ".xlsx", ".html"];

/// Error shown for uploads outside [`ALLOWED_EXTENSIONS`].
pub const UNSUPPORTED_TYPE_MESSAGE: &str =
    "Unsupported file type. Allowed: .docx, .pdf, .pptx, .doc, .xlsx, .html";

/// Error reported for failed tasks whose record carries no message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Fresh random task identifier.
pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercased extension of `filename` (with the dot) if it is allow-listed.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = format!(".{}", ext.to_ascii_lowercase());
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Lifecycle state of a task.
///
/// Serialized with the `status` tag so the stored JSON reads
/// `{"filename": .., "status": "failed", "error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Processing,
    Success,
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TaskState {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: Some(error.into()),
        }
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub const fn can_transition_to(&self, next: &TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing)
                | (Self::Queued, Self::Failed { .. })
                | (Self::Processing, Self::Success)
                | (Self::Processing, Self::Failed { .. })
        )
    }
}

/// Metadata stored under `task:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub filename: String,
    #[serde(flatten)]
    pub state: TaskState,
}

impl TaskRecord {
    pub fn new(filename: impl Into<String>, state: TaskState) -> Self {
        Self {
            filename: filename.into(),
            state,
        }
    }
}

/// What a poll reports. Markdown and error are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Queued,
    Processing,
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        markdown: Option<String>,
    },
    Failed {
        error: String,
    },
}

impl TaskOutcome {
    /// Build the outcome for `state`; `markdown` is only used for successful tasks.
    pub fn from_state(state: TaskState, markdown: Option<String>) -> Self {
        match state {
            TaskState::Queued => Self::Queued,
            TaskState::Processing => Self::Processing,
            TaskState::Success => Self::Success { markdown },
            TaskState::Failed { error } => Self::Failed {
                error: error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            },
        }
    }
}

/// Body of the upload and poll endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

impl TaskResponse {
    pub fn queued(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            outcome: TaskOutcome::Queued,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_list_is_case_insensitive() {
        for name in ["a.docx", "b.PDF", "c.Pptx", "d.doc", "e.xlsx", "f.html"] {
            assert!(allowed_extension(name).is_some(), "{name}");
        }
        assert_eq!(allowed_extension("Report.DOCX").as_deref(), Some(".docx"));
    }

    #[test]
    fn other_names_are_rejected() {
        for name in ["malware.exe", "noext", "archive.tar.gz", "notes.txt", "", "."] {
            assert!(allowed_extension(name).is_none(), "{name}");
        }
    }

    #[test]
    fn record_json_layout() {
        let record = TaskRecord::new("a.pdf", TaskState::failed("boom"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"filename": "a.pdf", "status": "failed", "error": "boom"})
        );

        let record = TaskRecord::new("a.pdf", TaskState::Queued);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"filename": "a.pdf", "status": "queued"})
        );
    }

    #[test]
    fn failed_record_without_error_reads_unknown() {
        let record: TaskRecord =
            serde_json::from_value(json!({"filename": "a.pdf", "status": "failed"})).unwrap();
        let outcome = TaskOutcome::from_state(record.state, None);
        assert_eq!(
            outcome,
            TaskOutcome::Failed {
                error: UNKNOWN_ERROR.to_string()
            }
        );
    }

    #[test]
    fn response_omits_missing_markdown() {
        let resp = TaskResponse {
            task_id: "t".into(),
            outcome: TaskOutcome::from_state(TaskState::Success, None),
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"task_id": "t", "status": "success"})
        );
        assert_eq!(
            serde_json::to_value(TaskResponse::queued("t")).unwrap(),
            json!({"task_id": "t", "status": "queued"})
        );
    }

    #[test]
    fn transitions_are_monotonic() {
        let failed = TaskState::failed("x");
        assert!(TaskState::Queued.can_transition_to(&TaskState::Processing));
        assert!(TaskState::Processing.can_transition_to(&TaskState::Success));
        assert!(TaskState::Processing.can_transition_to(&failed));
        assert!(!TaskState::Success.can_transition_to(&TaskState::Processing));
        assert!(!failed.can_transition_to(&TaskState::Success));
        assert!(!TaskState::Processing.can_transition_to(&TaskState::Queued));
    }

    #[test]
    fn task_ids_are_uuids() {
        let id = new_task_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_task_id());
    }
}
