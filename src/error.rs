// src/error.rs

use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserMsgKind {
    Success,
    Warn,
    Error,
    Info,
}

#[derive(Clone, Debug)]
pub struct UserMsg {
    pub kind: UserMsgKind,
    pub short: &'static str,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub enum AppError {
    // --------------------------------------------------
    // generic / plumbing
    // --------------------------------------------------
    Msg(String),

    // --------------------------------------------------
    // snapshot store (IO / durability)
    // --------------------------------------------------
    SnapshotReadFailed(String),
    SnapshotInvalidJson(String),
    SnapshotTooLarge { bytes: u64, max: u64 },
    SnapshotWriteFailed(String),
    SnapshotSyncFailed(String),
    SnapshotRenameFailed(String),
    SnapshotRemoveFailed(String),

    // --------------------------------------------------
    // submission
    // --------------------------------------------------
    SubmissionEncode(String),
    SubmissionTransport(String),
    SubmissionRejected { status: u16 },
    SubmissionInvalidResponse(String),

    // --------------------------------------------------
    // completion record
    // --------------------------------------------------
    CompletionRecordFailed(String),
}

impl AppError {
    pub fn user_msg(&self) -> UserMsg {
        use AppError::*;

        let mut kind = UserMsgKind::Error;
        let detail = Some(self.to_string());

        let short: &'static str = match self {
            Msg(_) => "Operation failed.",

            SnapshotReadFailed(_) => "Could not read your saved progress.",
            SnapshotInvalidJson(_) => "Saved progress is unreadable and was discarded.",
            SnapshotTooLarge { .. } => "Saved progress is too large.",
            SnapshotWriteFailed(_) | SnapshotSyncFailed(_) | SnapshotRenameFailed(_) => {
                kind = UserMsgKind::Warn;
                "Your progress could not be saved."
            }
            SnapshotRemoveFailed(_) => {
                kind = UserMsgKind::Warn;
                "Saved progress could not be removed."
            }

            SubmissionEncode(_)
            | SubmissionTransport(_)
            | SubmissionRejected { .. }
            | SubmissionInvalidResponse(_) => {
                "Sorry, there was an error submitting your assessment. Please try again."
            }

            CompletionRecordFailed(_) => {
                kind = UserMsgKind::Warn;
                "Completion details could not be stored."
            }
        };

        UserMsg {
            kind,
            short,
            detail,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AppError::*;

        match self {
            Msg(s) => write!(f, "{s}"),

            SnapshotReadFailed(s) => write!(f, "snapshot read failed: {s}"),
            SnapshotInvalidJson(s) => write!(f, "snapshot invalid json: {s}"),
            SnapshotTooLarge { bytes, max } => write!(f, "snapshot too large: {bytes} > {max}"),
            SnapshotWriteFailed(s) => write!(f, "snapshot write failed: {s}"),
            SnapshotSyncFailed(s) => write!(f, "snapshot sync failed: {s}"),
            SnapshotRenameFailed(s) => write!(f, "snapshot rename failed: {s}"),
            SnapshotRemoveFailed(s) => write!(f, "snapshot remove failed: {s}"),

            SubmissionEncode(s) => write!(f, "submission encode failed: {s}"),
            SubmissionTransport(s) => write!(f, "submission transport failed: {s}"),
            SubmissionRejected { status } => write!(f, "submission rejected: http {status}"),
            SubmissionInvalidResponse(s) => write!(f, "submission response invalid: {s}"),

            CompletionRecordFailed(s) => write!(f, "completion record failed: {s}"),
        }
    }
}

impl std::error::Error for AppError {}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_share_the_retry_message() {
        let a = AppError::SubmissionTransport("refused".into()).user_msg();
        let b = AppError::SubmissionRejected { status: 503 }.user_msg();
        assert_eq!(a.short, b.short);
        assert_eq!(a.kind, UserMsgKind::Error);
        assert!(a.short.contains("Please try again"));
    }

    #[test]
    fn snapshot_write_failure_is_a_warning() {
        let m = AppError::SnapshotWriteFailed("disk full".into()).user_msg();
        assert_eq!(m.kind, UserMsgKind::Warn);
        assert_eq!(m.detail.as_deref(), Some("snapshot write failed: disk full"));
    }
}
