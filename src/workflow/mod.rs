//! Document approval workflow: status derivation, assignment bookkeeping,
//! document numbering and the actions that drive them.
//!
//! Every action takes an explicit [`CallerContext`] and runs inside a single
//! database transaction that locks the document row. Notifications produced
//! by an action are returned as [`Notice`]s and dispatched by the caller once
//! the transaction has committed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, AssignmentEditPolicy};
use crate::models::Document;
use crate::notifications::Notice;

pub mod actions;
pub mod assignments;
pub mod error;
pub mod numbering;
pub mod status;
pub mod timeline;

pub use actions::{
    add_comment, approve_document, assign_document_number, cancel_document, close_document,
    create_document, reject_document, submit_review, update_document, DocumentInput,
    DocumentPatch,
};
pub use assignments::AssignmentRole;
pub use error::{WorkflowError, WorkflowResult};
pub use status::{ApprovalDecision, DocumentStatus, ReviewDecision, RoleProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Admin,
    DocumentController,
    Staff,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::DocumentController => "document_controller",
            RoleName::Staff => "staff",
        }
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(RoleName::Admin),
            "document_controller" => Ok(RoleName::DocumentController),
            "staff" => Ok(RoleName::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is performing a workflow action, resolved once per request.
#[derive(Debug, Clone, Serialize)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub username: String,
    pub roles: BTreeSet<RoleName>,
}

impl CallerContext {
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        roles: impl IntoIterator<Item = RoleName>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    /// Administrators and document controllers.
    pub fn can_manage_documents(&self) -> bool {
        self.has_role(RoleName::Admin) || self.has_role(RoleName::DocumentController)
    }

    pub fn can_close_or_cancel(&self, document: &Document) -> bool {
        self.can_manage_documents() || document.created_by == self.user_id
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub company_code: String,
    pub expiry_years: u32,
    pub edit_policy: AssignmentEditPolicy,
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            company_code: config.company_code.clone(),
            expiry_years: config.document_expiry_years,
            edit_policy: config.assignment_edit_policy,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            company_code: crate::config::DEFAULT_COMPANY_CODE.to_string(),
            expiry_years: crate::config::DEFAULT_EXPIRY_YEARS,
            edit_policy: AssignmentEditPolicy::Preserve,
        }
    }
}

/// Result of a successful workflow action.
#[derive(Debug)]
pub struct Outcome {
    pub document: Document,
    pub message: String,
    pub notices: Vec<Notice>,
}
