use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Initiation,
    Review,
    WaitingApproval,
    Approved,
    Rejected,
    Closed,
    Cancel,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 7] = [
        DocumentStatus::Initiation,
        DocumentStatus::Review,
        DocumentStatus::WaitingApproval,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::Closed,
        DocumentStatus::Cancel,
    ];

    pub const OPEN: [DocumentStatus; 3] = [
        DocumentStatus::Initiation,
        DocumentStatus::Review,
        DocumentStatus::WaitingApproval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Initiation => "initiation",
            DocumentStatus::Review => "review",
            DocumentStatus::WaitingApproval => "waiting_approval",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Closed => "closed",
            DocumentStatus::Cancel => "cancel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Initiation => "Initiation",
            DocumentStatus::Review => "Review",
            DocumentStatus::WaitingApproval => "Waiting Approval",
            DocumentStatus::Approved => "Approved",
            DocumentStatus::Rejected => "Rejected",
            DocumentStatus::Closed => "Closed",
            DocumentStatus::Cancel => "Cancel",
        }
    }

    /// Reviews, approvals, edits and cancellation are only possible here.
    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Rejected | DocumentStatus::Closed | DocumentStatus::Cancel
        )
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown document status '{value}'"))
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Submitted,
    Approved,
    RequestedChanges,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Submitted => "submitted",
            ReviewDecision::Approved => "approved",
            ReviewDecision::RequestedChanges => "requested_changes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReviewDecision::Submitted => "submitted",
            ReviewDecision::Approved => "approved",
            ReviewDecision::RequestedChanges => "requested changes",
        }
    }

    pub fn requires_comment(&self) -> bool {
        matches!(self, ReviewDecision::RequestedChanges)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::Rejected => "rejected",
        }
    }
}

/// Completion counts for one assignment role, re-read after every completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleProgress {
    pub total: usize,
    pub completed: usize,
}

impl RoleProgress {
    pub fn new(total: usize, completed: usize) -> Self {
        Self { total, completed }
    }

    /// Vacuously true when nobody holds the role.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// The status an open document should hold given its assignment progress.
///
/// A document with reviewers done and no approvers stays in
/// `WaitingApproval`; nothing moves it to `Approved` automatically.
pub fn derive_open_status(reviewers: RoleProgress, approvers: RoleProgress) -> DocumentStatus {
    if !reviewers.is_complete() {
        DocumentStatus::Review
    } else if approvers.total > 0 && approvers.is_complete() {
        DocumentStatus::Approved
    } else if reviewers.total == 0 && approvers.total == 0 {
        DocumentStatus::Initiation
    } else {
        DocumentStatus::WaitingApproval
    }
}

pub fn status_of(document: &Document) -> DocumentStatus {
    document.status.parse().unwrap_or_else(|err: String| {
        tracing::warn!(document_id = %document.id, error = %err, "unrecognized document status");
        DocumentStatus::Initiation
    })
}

/// At most the terminal field matching the status is populated.
pub fn terminal_fields_consistent(document: &Document) -> bool {
    let rejected = document.rejection_reason.is_some();
    let cancelled = document.cancellation_reason.is_some() || document.cancelled_at.is_some();
    let closed = document.closed_at.is_some();

    match status_of(document) {
        DocumentStatus::Rejected => rejected && !cancelled && !closed,
        DocumentStatus::Cancel => cancelled && !rejected && !closed,
        DocumentStatus::Closed => closed && !rejected && !cancelled,
        _ => !rejected && !cancelled && !closed,
    }
}
