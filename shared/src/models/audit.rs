//! Audit session lifecycle

use serde::{Deserialize, Serialize};

/// Lifecycle state of a physical-count audit session.
///
/// `Pending` is the transient pre-snapshot state a session passes through
/// while its items are being captured; sessions are handed to callers in
/// `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::InProgress => "in_progress",
            AuditStatus::Completed => "completed",
            AuditStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AuditStatus::Pending),
            "in_progress" => Some(AuditStatus::InProgress),
            "completed" => Some(AuditStatus::Completed),
            "cancelled" => Some(AuditStatus::Cancelled),
            _ => None,
        }
    }

    /// A session counts against the one-active-session-per-scope rule while
    /// it is pending or in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, AuditStatus::Pending | AuditStatus::InProgress)
    }
}

/// Valid lifecycle transitions:
/// pending -> in_progress, in_progress -> completed/cancelled,
/// completed -> in_progress (revert), pending -> cancelled.
pub fn audit_transition_allowed(from: AuditStatus, to: AuditStatus) -> bool {
    use AuditStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Cancelled)
            | (Completed, InProgress)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use AuditStatus::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(audit_transition_allowed(Pending, InProgress));
        assert!(audit_transition_allowed(InProgress, Completed));
        assert!(audit_transition_allowed(InProgress, Cancelled));
        assert!(audit_transition_allowed(Completed, InProgress));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!audit_transition_allowed(Completed, Cancelled));
        assert!(!audit_transition_allowed(Cancelled, InProgress));
        assert!(!audit_transition_allowed(Completed, Pending));
        assert!(!audit_transition_allowed(InProgress, Pending));
    }

    #[test]
    fn test_active_states() {
        assert!(Pending.is_active());
        assert!(InProgress.is_active());
        assert!(!Completed.is_active());
        assert!(!Cancelled.is_active());
    }
}
