use crate::error::SeoError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ExecutionState
// ---------------------------------------------------------------------------

/// Per-action state machine.
///
/// `Pending → BackedUp → Mutated → Written` on success,
/// `Pending → BackedUp → NoSiteFound` when nothing matched (no write),
/// `Pending → BackedUp → RolledBack` when the scoped work failed.
/// `Skipped` covers failures before any backup was taken and `Simulated`
/// is the dry-run terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    BackedUp,
    Mutated,
    Written,
    NoSiteFound,
    RolledBack,
    Skipped,
    Simulated,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Written
                | ExecutionState::NoSiteFound
                | ExecutionState::RolledBack
                | ExecutionState::Skipped
                | ExecutionState::Simulated
        )
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Outcome of one executor run.
///
/// Constructed only through [`ExecutionResult::written`],
/// [`ExecutionResult::simulated`] and [`ExecutionResult::failed`], which keep
/// `success ⇒ !changed_files.is_empty()` and `!success ⇒ error.is_some()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub changed_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub timestamp: DateTime<Utc>,
    pub state: ExecutionState,
}

impl ExecutionResult {
    pub fn written(
        action_id: impl Into<String>,
        message: impl Into<String>,
        file: PathBuf,
        backup_path: PathBuf,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            success: true,
            message: message.into(),
            changed_files: vec![file],
            backup_path: Some(backup_path),
            error: None,
            execution_time: Duration::ZERO,
            timestamp: Utc::now(),
            state: ExecutionState::Written,
        }
    }

    /// Dry-run success naming the file that would have been written.
    pub fn simulated(action_id: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self {
            action_id: action_id.into(),
            success: true,
            message: message.into(),
            changed_files: vec![file],
            backup_path: None,
            error: None,
            execution_time: Duration::ZERO,
            timestamp: Utc::now(),
            state: ExecutionState::Simulated,
        }
    }

    pub fn failed(action_id: impl Into<String>, err: &SeoError, state: ExecutionState) -> Self {
        Self {
            action_id: action_id.into(),
            success: false,
            message: err.to_string(),
            changed_files: Vec::new(),
            backup_path: None,
            error: Some(err.kind().to_string()),
            execution_time: Duration::ZERO,
            timestamp: Utc::now(),
            state,
        }
    }

    pub fn with_backup(mut self, backup_path: Option<PathBuf>) -> Self {
        self.backup_path = backup_path;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed;
        self
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "{status} | {} | {}", self.action_id, self.message)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_kind() {
        let err = SeoError::FileNotFound(PathBuf::from("/repo/src/app/layout.tsx"));
        let r = ExecutionResult::failed("action-2", &err, ExecutionState::Skipped);
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("FileNotFound"));
        assert!(r.changed_files.is_empty());
        assert!(r.to_string().starts_with("FAILED | action-2 |"));
    }

    #[test]
    fn written_result_lists_file() {
        let r = ExecutionResult::written(
            "action-1",
            "title updated",
            PathBuf::from("/repo/layout.tsx"),
            PathBuf::from("/b/1_layout.tsx"),
        );
        assert!(r.success);
        assert_eq!(r.changed_files.len(), 1);
        assert!(r.error.is_none());
        assert!(r.state.is_terminal());
    }

    #[test]
    fn json_shape_uses_millis() {
        let r = ExecutionResult::simulated("a", "dry", PathBuf::from("x.html"))
            .with_elapsed(Duration::from_millis(1500));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["execution_time"], 1500);
        assert_eq!(v["state"], "simulated");
        assert!(v.get("error").is_none());
    }
}
