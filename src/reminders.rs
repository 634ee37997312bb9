//! Daily reminder sweep: approaching and overdue target dates, and upcoming
//! expiry of approved documents. The sweep only reads; the notices it
//! returns are dispatched by the caller.

use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::Document;
use crate::notifications::{EmailTemplate, Notice};
use crate::schema::{document_assignments, documents};
use crate::workflow::status::{status_of, DocumentStatus};
use crate::workflow::AssignmentRole;

/// A target date this many days away (or fewer) counts as due soon.
pub const DUE_SOON_DAYS: i64 = 3;

/// Days before expiry on which the creator is warned, once each.
pub const EXPIRY_WARNING_DAYS: [i64; 5] = [30, 14, 7, 3, 1];

/// Overdue reminders go out on the first overdue day and then weekly.
pub fn should_send_overdue(days_overdue: i64) -> bool {
    days_overdue == 1 || (days_overdue > 0 && days_overdue % 7 == 0)
}

pub fn is_due_soon(days_until: i64) -> bool {
    (0..=DUE_SOON_DAYS).contains(&days_until)
}

pub fn is_expiry_warning_day(days_until_expiry: i64) -> bool {
    EXPIRY_WARNING_DAYS.contains(&days_until_expiry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    DueSoon { days_until: i64 },
    Overdue { days_overdue: i64 },
    ExpiryWarning { days_until_expiry: i64 },
}

#[derive(Debug, Clone)]
pub struct ReminderCandidate {
    pub document: Document,
    pub pending_reviewers: Vec<Uuid>,
    pub pending_approvers: Vec<Uuid>,
}

impl ReminderCandidate {
    /// Whoever the document is waiting on: reviewers first, then approvers.
    pub fn pending_assignees(&self) -> &[Uuid] {
        if self.pending_reviewers.is_empty() {
            &self.pending_approvers
        } else {
            &self.pending_reviewers
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReminder {
    pub kind: ReminderKind,
    pub recipients: Vec<Uuid>,
}

pub fn plan(candidate: &ReminderCandidate, today: NaiveDate) -> Option<PlannedReminder> {
    let document = &candidate.document;
    let status = status_of(document);

    if status.is_open() {
        let target = document.target_approval_date?;
        let days_until = (target - today).num_days();

        if is_due_soon(days_until) {
            let recipients = candidate.pending_assignees().to_vec();
            return (!recipients.is_empty()).then_some(PlannedReminder {
                kind: ReminderKind::DueSoon { days_until },
                recipients,
            });
        }

        let days_overdue = -days_until;
        if should_send_overdue(days_overdue) {
            let mut recipients = candidate.pending_assignees().to_vec();
            if !recipients.contains(&document.created_by) {
                recipients.push(document.created_by);
            }
            return Some(PlannedReminder {
                kind: ReminderKind::Overdue { days_overdue },
                recipients,
            });
        }
        return None;
    }

    if matches!(status, DocumentStatus::Approved | DocumentStatus::Closed) {
        let expiry = document.expiry_date?;
        let days_until_expiry = (expiry - today).num_days();
        if is_expiry_warning_day(days_until_expiry) {
            return Some(PlannedReminder {
                kind: ReminderKind::ExpiryWarning { days_until_expiry },
                recipients: vec![document.created_by],
            });
        }
    }

    None
}

#[derive(Debug, Default, Serialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub due_soon: usize,
    pub overdue: usize,
    pub expiry_warnings: usize,
    #[serde(skip)]
    pub notices: Vec<Notice>,
}

pub fn scan(conn: &mut PgConnection, today: NaiveDate) -> QueryResult<ScanSummary> {
    let open: Vec<&str> = DocumentStatus::OPEN.iter().map(|s| s.as_str()).collect();
    let expiring = [
        DocumentStatus::Approved.as_str(),
        DocumentStatus::Closed.as_str(),
    ];

    let mut candidates: Vec<Document> = documents::table
        .filter(documents::status.eq_any(open))
        .filter(documents::target_approval_date.is_not_null())
        .load(conn)?;
    candidates.extend(
        documents::table
            .filter(documents::status.eq_any(expiring))
            .filter(documents::expiry_date.is_not_null())
            .load::<Document>(conn)?,
    );

    let ids: Vec<Uuid> = candidates.iter().map(|d| d.id).collect();
    let pending: Vec<(Uuid, Uuid, String)> = document_assignments::table
        .filter(document_assignments::document_id.eq_any(&ids))
        .filter(document_assignments::is_completed.eq(false))
        .order(document_assignments::sequence_order.asc())
        .select((
            document_assignments::document_id,
            document_assignments::user_id,
            document_assignments::role,
        ))
        .load(conn)?;

    let mut by_document: HashMap<Uuid, (Vec<Uuid>, Vec<Uuid>)> = HashMap::new();
    for (document_id, user_id, role) in pending {
        let entry = by_document.entry(document_id).or_default();
        match role.parse::<AssignmentRole>() {
            Ok(AssignmentRole::Reviewer) => entry.0.push(user_id),
            Ok(AssignmentRole::Approver) => entry.1.push(user_id),
            _ => {}
        }
    }

    let mut summary = ScanSummary {
        scanned: candidates.len(),
        ..ScanSummary::default()
    };

    for document in candidates {
        let (pending_reviewers, pending_approvers) =
            by_document.remove(&document.id).unwrap_or_default();
        let candidate = ReminderCandidate {
            document,
            pending_reviewers,
            pending_approvers,
        };
        let Some(reminder) = plan(&candidate, today) else {
            continue;
        };

        match reminder.kind {
            ReminderKind::DueSoon { .. } => summary.due_soon += 1,
            ReminderKind::Overdue { .. } => summary.overdue += 1,
            ReminderKind::ExpiryWarning { .. } => summary.expiry_warnings += 1,
        }
        summary
            .notices
            .extend(reminder_notices(&candidate.document, &reminder));
    }

    info!(
        scanned = summary.scanned,
        due_soon = summary.due_soon,
        overdue = summary.overdue,
        expiry_warnings = summary.expiry_warnings,
        notices = summary.notices.len(),
        "reminder scan finished"
    );

    Ok(summary)
}

fn reminder_notices(document: &Document, reminder: &PlannedReminder) -> Vec<Notice> {
    let (subject, message) = match reminder.kind {
        ReminderKind::DueSoon { days_until: 0 } => (
            format!("Due today: {}", document.title),
            "Your action is due today on".to_string(),
        ),
        ReminderKind::DueSoon { days_until } => (
            format!("Due in {days_until} day(s): {}", document.title),
            format!("Your action is due in {days_until} day(s) on"),
        ),
        ReminderKind::Overdue { days_overdue } => (
            format!("Overdue by {days_overdue} day(s): {}", document.title),
            format!("Approval is {days_overdue} day(s) past its target date for"),
        ),
        ReminderKind::ExpiryWarning { days_until_expiry } => (
            format!("Expires in {days_until_expiry} day(s): {}", document.title),
            format!("This document expires in {days_until_expiry} day(s):"),
        ),
    };

    reminder
        .recipients
        .iter()
        .map(|user_id| {
            let mut notice = Notice::for_document(
                *user_id,
                document,
                EmailTemplate::Reminder,
                subject.clone(),
                format!("{message} {}", document.title),
            )
            .with("message", message.clone());
            if let (ReminderKind::ExpiryWarning { .. }, Some(expiry)) =
                (reminder.kind, document.expiry_date)
            {
                notice = notice.with("due_date", expiry.to_string());
            }
            notice
        })
        .collect()
}
