use chrono::{Months, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::assignments::{self, AssignmentRole};
use super::error::{WorkflowError, WorkflowResult};
use super::numbering;
use super::status::{
    derive_open_status, status_of, ApprovalDecision, DocumentStatus, ReviewDecision,
};
use super::timeline::{self, TimelineEvent};
use super::{CallerContext, Outcome, WorkflowSettings};
use crate::models::{
    AffectedDepartment, Comment, Document, NewApproval, NewComment, NewDocument, NewReview,
};
use crate::notifications::{EmailTemplate, Notice};
use crate::schema::{
    affected_departments, departments, document_approvals, document_comments, document_reviews,
    document_types, documents, users,
};

const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    pub title: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub department_id: Uuid,
    pub document_type_id: Uuid,
    pub target_approval_date: Option<NaiveDate>,
    #[serde(default)]
    pub reviewers: Vec<Uuid>,
    #[serde(default)]
    pub approvers: Vec<Uuid>,
    #[serde(default)]
    pub affected_departments: Vec<Uuid>,
}

/// Partial edit. Absent fields are left alone; a blank description clears
/// it; an assignee list that is present replaces the current one for that
/// role.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub department_id: Option<Uuid>,
    pub document_type_id: Option<Uuid>,
    pub target_approval_date: Option<NaiveDate>,
    pub reviewers: Option<Vec<Uuid>>,
    pub approvers: Option<Vec<Uuid>>,
    pub affected_departments: Option<Vec<Uuid>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = documents)]
struct DocumentChanges {
    title: Option<String>,
    description: Option<Option<String>>,
    version: Option<String>,
    department_id: Option<Uuid>,
    document_type_id: Option<Uuid>,
    target_approval_date: Option<NaiveDate>,
    updated_at: NaiveDateTime,
}

/// Effective date plus `years`, clamped to month end (29 Feb lands on 28 Feb).
pub fn expiry_date_for(effective: NaiveDate, years: u32) -> Option<NaiveDate> {
    effective.checked_add_months(Months::new(years.saturating_mul(12)))
}

pub fn create_document(
    conn: &mut PgConnection,
    caller: &CallerContext,
    input: DocumentInput,
) -> WorkflowResult<Outcome> {
    let title = required_text(&input.title, "title")?;
    let reviewers = assignments::dedupe_preserving_order(&input.reviewers);
    let approvers = assignments::dedupe_preserving_order(&input.approvers);
    let affected = assignments::dedupe_preserving_order(&input.affected_departments);

    conn.transaction::<_, WorkflowError, _>(|conn| {
        ensure_department(conn, input.department_id)?;
        ensure_document_type(conn, input.document_type_id)?;
        ensure_users(conn, &reviewers, "reviewer")?;
        ensure_users(conn, &approvers, "approver")?;
        ensure_departments(conn, &affected)?;

        let now = Utc::now().naive_utc();
        let id = Uuid::new_v4();
        let status = derive_open_status(
            super::RoleProgress::new(reviewers.len(), 0),
            super::RoleProgress::new(approvers.len(), 0),
        );

        let new_document = NewDocument {
            id,
            document_number: numbering::pending_placeholder(now, id),
            title,
            description: optional_text(input.description.as_deref()),
            status: status.as_str().to_string(),
            version: optional_text(input.version.as_deref())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            department_id: input.department_id,
            document_type_id: input.document_type_id,
            target_approval_date: input.target_approval_date,
            created_by: caller.user_id,
        };

        let document: Document = diesel::insert_into(documents::table)
            .values(&new_document)
            .get_result(conn)?;

        assignments::create_assignments(conn, id, caller.user_id, &reviewers, &approvers, now)?;
        replace_affected_departments(conn, id, &affected)?;

        timeline::append(
            conn,
            id,
            TimelineEvent::Created,
            "Document created",
            Some(format!(
                "{} created with {} reviewer(s) and {} approver(s); status {}",
                document.title,
                reviewers.len(),
                approvers.len(),
                status.label()
            )),
            Some(caller.user_id),
        )?;

        let actor = actor_name(conn, caller)?;
        let mut notices = assignment_notices(&document, &reviewers, AssignmentRole::Reviewer, &actor);
        notices.extend(assignment_notices(
            &document,
            &approvers,
            AssignmentRole::Approver,
            &actor,
        ));

        info!(document_id = %id, status = status.as_str(), created_by = %caller.user_id, "document created");

        Ok(Outcome {
            document,
            message: "Document created".to_string(),
            notices,
        })
    })
}

pub fn update_document(
    conn: &mut PgConnection,
    settings: &WorkflowSettings,
    caller: &CallerContext,
    document_id: Uuid,
    patch: DocumentPatch,
) -> WorkflowResult<Outcome> {
    let title = patch
        .title
        .as_deref()
        .map(|value| required_text(value, "title"))
        .transpose()?;

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        if !caller.can_close_or_cancel(&document) {
            return Err(WorkflowError::forbidden(
                "only the creator or a document controller can edit this document",
            ));
        }
        let status = status_of(&document);
        if !status.is_open() {
            return Err(WorkflowError::conflict(format!(
                "document is {} and can no longer be edited",
                status.label()
            )));
        }

        if let Some(department_id) = patch.department_id {
            ensure_department(conn, department_id)?;
        }
        if let Some(document_type_id) = patch.document_type_id {
            ensure_document_type(conn, document_type_id)?;
        }

        let now = Utc::now().naive_utc();
        diesel::update(documents::table.find(document_id))
            .set(&DocumentChanges {
                title,
                description: patch
                    .description
                    .as_deref()
                    .map(|value| optional_text(Some(value))),
                version: patch.version.as_deref().and_then(|v| optional_text(Some(v))),
                department_id: patch.department_id,
                document_type_id: patch.document_type_id,
                target_approval_date: patch.target_approval_date,
                updated_at: now,
            })
            .execute(conn)?;

        let mut added_reviewers = Vec::new();
        let mut added_approvers = Vec::new();
        let mut preserved = Vec::new();

        if let Some(reviewers) = &patch.reviewers {
            ensure_users(conn, reviewers, "reviewer")?;
            let plan = assignments::reconcile_assignments(
                conn,
                document_id,
                AssignmentRole::Reviewer,
                reviewers,
                settings.edit_policy,
            )?;
            added_reviewers = plan.added_users();
            preserved.extend(plan.preserved);
        }
        if let Some(approvers) = &patch.approvers {
            ensure_users(conn, approvers, "approver")?;
            let plan = assignments::reconcile_assignments(
                conn,
                document_id,
                AssignmentRole::Approver,
                approvers,
                settings.edit_policy,
            )?;
            added_approvers = plan.added_users();
            preserved.extend(plan.preserved);
        }
        if let Some(affected) = &patch.affected_departments {
            let affected = assignments::dedupe_preserving_order(affected);
            ensure_departments(conn, &affected)?;
            replace_affected_departments(conn, document_id, &affected)?;
        }

        let description = if preserved.is_empty() {
            None
        } else {
            Some(format!(
                "{} completed assignment(s) kept for history",
                preserved.len()
            ))
        };
        timeline::append(
            conn,
            document_id,
            TimelineEvent::Updated,
            "Document updated",
            description,
            Some(caller.user_id),
        )?;

        let actor = actor_name(conn, caller)?;
        let (document, mut notices) = advance(conn, settings, caller, &actor, now, document_id)?;
        let added_approvers = without_ready_notice(added_approvers, &notices);
        notices.extend(assignment_notices(
            &document,
            &added_reviewers,
            AssignmentRole::Reviewer,
            &actor,
        ));
        notices.extend(assignment_notices(
            &document,
            &added_approvers,
            AssignmentRole::Approver,
            &actor,
        ));

        info!(document_id = %document_id, status = %document.status, "document updated");

        Ok(Outcome {
            document,
            message: "Document updated".to_string(),
            notices,
        })
    })
}

pub fn submit_review(
    conn: &mut PgConnection,
    settings: &WorkflowSettings,
    caller: &CallerContext,
    document_id: Uuid,
    decision: ReviewDecision,
    comment: Option<String>,
) -> WorkflowResult<Outcome> {
    let comment = optional_text(comment.as_deref());
    if decision.requires_comment() && comment.is_none() {
        return Err(WorkflowError::validation(
            "a comment is required when requesting changes",
        ));
    }

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        ensure_open(&document, "reviews")?;

        let assignment =
            assignments::find_for_user(conn, document_id, caller.user_id, AssignmentRole::Reviewer)?
                .ok_or_else(|| WorkflowError::not_found("reviewer assignment for caller"))?;

        let now = Utc::now().naive_utc();
        assignments::complete_assignment(conn, assignment.id, comment.as_deref(), now)?;

        diesel::insert_into(document_reviews::table)
            .values(&NewReview {
                id: Uuid::new_v4(),
                document_id,
                reviewer_id: caller.user_id,
                decision: decision.as_str().to_string(),
                comment: comment.clone(),
            })
            .execute(conn)?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::ReviewSubmitted,
            format!("Review {} by {actor}", decision.label()),
            comment.clone(),
            Some(caller.user_id),
        )?;

        let (updated, mut notices) = advance(conn, settings, caller, &actor, now, document_id)?;

        if document.created_by != caller.user_id {
            let mut notice = Notice::for_document(
                document.created_by,
                &updated,
                EmailTemplate::ReviewSubmitted,
                format!("Review submitted: {}", updated.title),
                format!("{actor} {} the review of {}", decision.label(), updated.title),
            )
            .with("actor_name", actor.clone())
            .with("decision", decision.label());
            if let Some(comment) = &comment {
                notice = notice.with("comment", comment.clone());
            }
            notices.insert(0, notice);
        }

        let message = if status_of(&updated) == DocumentStatus::WaitingApproval
            && status_of(&document) != DocumentStatus::WaitingApproval
        {
            "Review submitted; document is ready for approval"
        } else {
            "Review submitted"
        };

        info!(document_id = %document_id, reviewer = %caller.user_id, decision = decision.as_str(), status = %updated.status, "review submitted");

        Ok(Outcome {
            document: updated,
            message: message.to_string(),
            notices,
        })
    })
}

pub fn approve_document(
    conn: &mut PgConnection,
    settings: &WorkflowSettings,
    caller: &CallerContext,
    document_id: Uuid,
    comment: Option<String>,
) -> WorkflowResult<Outcome> {
    let comment = optional_text(comment.as_deref());

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        ensure_open(&document, "approvals")?;
        let assignment = approver_assignment(conn, document_id, caller)?;
        ensure_reviews_complete(conn, document_id)?;

        let now = Utc::now().naive_utc();
        assignments::complete_assignment(conn, assignment.id, comment.as_deref(), now)?;
        record_approval(
            conn,
            document_id,
            caller.user_id,
            ApprovalDecision::Approved,
            comment.clone(),
        )?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::ApprovalRecorded,
            format!("Approved by {actor}"),
            comment.clone(),
            Some(caller.user_id),
        )?;

        let (updated, mut notices) = advance(conn, settings, caller, &actor, now, document_id)?;

        if document.created_by != caller.user_id {
            let mut notice = Notice::for_document(
                document.created_by,
                &updated,
                EmailTemplate::ApprovalSubmitted,
                format!("Approval recorded: {}", updated.title),
                format!("{actor} approved {}", updated.title),
            )
            .with("actor_name", actor.clone())
            .with("decision", ApprovalDecision::Approved.as_str());
            if let Some(comment) = &comment {
                notice = notice.with("comment", comment.clone());
            }
            notices.insert(0, notice);
        }

        let message = if status_of(&updated) == DocumentStatus::Approved {
            "Approval recorded; document is approved"
        } else {
            "Approval recorded"
        };

        info!(document_id = %document_id, approver = %caller.user_id, status = %updated.status, "approval recorded");

        Ok(Outcome {
            document: updated,
            message: message.to_string(),
            notices,
        })
    })
}

/// A single rejection ends the workflow whatever the other approvers did.
pub fn reject_document(
    conn: &mut PgConnection,
    caller: &CallerContext,
    document_id: Uuid,
    reason: &str,
) -> WorkflowResult<Outcome> {
    let reason = required_text(reason, "rejection reason")?;

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        ensure_open(&document, "approvals")?;
        let assignment = approver_assignment(conn, document_id, caller)?;
        ensure_reviews_complete(conn, document_id)?;

        let now = Utc::now().naive_utc();
        assignments::complete_assignment(conn, assignment.id, Some(reason.as_str()), now)?;
        record_approval(
            conn,
            document_id,
            caller.user_id,
            ApprovalDecision::Rejected,
            Some(reason.clone()),
        )?;

        let updated: Document = diesel::update(documents::table.find(document_id))
            .set((
                documents::status.eq(DocumentStatus::Rejected.as_str()),
                documents::rejection_reason.eq(Some(reason.clone())),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::Rejected,
            format!("Rejected by {actor}"),
            Some(reason.clone()),
            Some(caller.user_id),
        )?;

        let notices = status_notices(
            &updated,
            recipients_with_creator(conn, &updated, caller)?,
            &actor,
        )
        .into_iter()
        .map(|notice| notice.with("reason", reason.clone()))
        .collect();

        info!(document_id = %document_id, approver = %caller.user_id, "document rejected");

        Ok(Outcome {
            document: updated,
            message: "Document rejected".to_string(),
            notices,
        })
    })
}

pub fn close_document(
    conn: &mut PgConnection,
    caller: &CallerContext,
    document_id: Uuid,
    comment: Option<String>,
) -> WorkflowResult<Outcome> {
    let comment = optional_text(comment.as_deref());

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        if !caller.can_close_or_cancel(&document) {
            return Err(WorkflowError::forbidden(
                "only the creator or a document controller can close this document",
            ));
        }
        let status = status_of(&document);
        if status != DocumentStatus::Approved {
            return Err(WorkflowError::conflict(format!(
                "only approved documents can be closed; document is {}",
                status.label()
            )));
        }

        let now = Utc::now().naive_utc();
        let updated: Document = diesel::update(documents::table.find(document_id))
            .set((
                documents::status.eq(DocumentStatus::Closed.as_str()),
                documents::closed_at.eq(Some(now)),
                documents::closing_comment.eq(comment.clone()),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::Closed,
            format!("Closed by {actor}"),
            comment.clone(),
            Some(caller.user_id),
        )?;

        let recipients = if updated.created_by == caller.user_id {
            Vec::new()
        } else {
            vec![updated.created_by]
        };
        let notices = status_notices(&updated, recipients, &actor);

        info!(document_id = %document_id, closed_by = %caller.user_id, "document closed");

        Ok(Outcome {
            document: updated,
            message: "Document closed".to_string(),
            notices,
        })
    })
}

pub fn cancel_document(
    conn: &mut PgConnection,
    caller: &CallerContext,
    document_id: Uuid,
    reason: &str,
) -> WorkflowResult<Outcome> {
    let reason = required_text(reason, "cancellation reason")?;

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        if !caller.can_close_or_cancel(&document) {
            return Err(WorkflowError::forbidden(
                "only the creator or a document controller can cancel this document",
            ));
        }
        let status = status_of(&document);
        if !status.is_open() {
            return Err(WorkflowError::conflict(format!(
                "only documents in Initiation, Review or Waiting Approval can be cancelled; document is {}",
                status.label()
            )));
        }

        let now = Utc::now().naive_utc();
        let updated: Document = diesel::update(documents::table.find(document_id))
            .set((
                documents::status.eq(DocumentStatus::Cancel.as_str()),
                documents::cancellation_reason.eq(Some(reason.clone())),
                documents::cancelled_at.eq(Some(now)),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::Cancelled,
            format!("Cancelled by {actor}"),
            Some(reason.clone()),
            Some(caller.user_id),
        )?;

        let mut recipients = assignments::pending_users(conn, document_id, AssignmentRole::Reviewer)?;
        recipients.extend(assignments::pending_users(
            conn,
            document_id,
            AssignmentRole::Approver,
        )?);
        recipients.push(updated.created_by);
        let recipients: Vec<Uuid> = assignments::dedupe_preserving_order(&recipients)
            .into_iter()
            .filter(|user_id| *user_id != caller.user_id)
            .collect();

        let notices = status_notices(&updated, recipients, &actor)
            .into_iter()
            .map(|notice| notice.with("reason", reason.clone()))
            .collect();

        info!(document_id = %document_id, cancelled_by = %caller.user_id, "document cancelled");

        Ok(Outcome {
            document: updated,
            message: "Document cancelled".to_string(),
            notices,
        })
    })
}

/// Replaces the pending placeholder with a real number, either allocated
/// from the department/type prefix or supplied by the caller.
pub fn assign_document_number(
    conn: &mut PgConnection,
    settings: &WorkflowSettings,
    caller: &CallerContext,
    document_id: Uuid,
    manual_number: Option<&str>,
) -> WorkflowResult<Outcome> {
    if !caller.can_manage_documents() {
        return Err(WorkflowError::forbidden(
            "only administrators and document controllers can assign document numbers",
        ));
    }

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let document = lock_document(conn, document_id)?;
        if !numbering::is_pending(&document.document_number) {
            return Err(WorkflowError::conflict(format!(
                "document number already assigned: {}",
                document.document_number
            )));
        }

        let manual = manual_number.map(str::trim).filter(|value| !value.is_empty());
        let (number, mode) = match manual {
            Some(input) => {
                let number = numbering::normalize_manual_number(input)?;
                if numbering::number_in_use(conn, &number, document_id)? {
                    return Err(WorkflowError::conflict(format!(
                        "duplicate document number {number}"
                    )));
                }
                (number, "manual")
            }
            None => {
                let department_code: String = departments::table
                    .find(document.department_id)
                    .select(departments::code)
                    .first(conn)?;
                let type_code: String = document_types::table
                    .find(document.document_type_id)
                    .select(document_types::code)
                    .first(conn)?;
                let prefix =
                    numbering::build_prefix(&settings.company_code, &department_code, &type_code);
                (numbering::allocate_next(conn, &prefix)?, "automatic")
            }
        };

        let now = Utc::now().naive_utc();
        let updated: Document = diesel::update(documents::table.find(document_id))
            .set((
                documents::document_number.eq(&number),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?;

        timeline::append(
            conn,
            document_id,
            TimelineEvent::NumberAssigned,
            format!("Document number {number} assigned"),
            Some(format!("{mode} allocation")),
            Some(caller.user_id),
        )?;

        info!(document_id = %document_id, number = %number, mode, "document number assigned");

        Ok(Outcome {
            document: updated,
            message: format!("Document number {number} assigned"),
            notices: Vec::new(),
        })
    })
}

pub fn add_comment(
    conn: &mut PgConnection,
    caller: &CallerContext,
    document_id: Uuid,
    body: &str,
) -> WorkflowResult<Comment> {
    let body = required_text(body, "comment")?;

    conn.transaction::<_, WorkflowError, _>(|conn| {
        let exists: Option<Uuid> = documents::table
            .find(document_id)
            .select(documents::id)
            .first(conn)
            .optional()?;
        if exists.is_none() {
            return Err(WorkflowError::not_found("document"));
        }

        let comment: Comment = diesel::insert_into(document_comments::table)
            .values(&NewComment {
                id: Uuid::new_v4(),
                document_id,
                author_id: caller.user_id,
                body,
            })
            .get_result(conn)?;

        let actor = actor_name(conn, caller)?;
        timeline::append(
            conn,
            document_id,
            TimelineEvent::CommentAdded,
            format!("Comment by {actor}"),
            None,
            Some(caller.user_id),
        )?;

        Ok(comment)
    })
}

/// Re-derives the status of an open document from its assignments and
/// applies the automatic transitions (into Review, Waiting Approval or
/// Approved) with their timeline entries and notices.
fn advance(
    conn: &mut PgConnection,
    settings: &WorkflowSettings,
    caller: &CallerContext,
    actor: &str,
    now: NaiveDateTime,
    document_id: Uuid,
) -> WorkflowResult<(Document, Vec<Notice>)> {
    let document: Document = documents::table.find(document_id).first(conn)?;
    let current = status_of(&document);

    let reviewers = assignments::role_progress(conn, document_id, AssignmentRole::Reviewer)?;
    let approvers = assignments::role_progress(conn, document_id, AssignmentRole::Approver)?;
    let next = derive_open_status(reviewers, approvers);

    if next == current {
        return Ok((document, Vec::new()));
    }

    let updated: Document = if next == DocumentStatus::Approved {
        let effective = now.date();
        diesel::update(documents::table.find(document_id))
            .set((
                documents::status.eq(next.as_str()),
                documents::approved_at.eq(Some(now)),
                documents::published_at.eq(Some(now)),
                documents::effective_date.eq(Some(effective)),
                documents::expiry_date.eq(expiry_date_for(effective, settings.expiry_years)),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?
    } else {
        diesel::update(documents::table.find(document_id))
            .set((
                documents::status.eq(next.as_str()),
                documents::updated_at.eq(now),
            ))
            .get_result(conn)?
    };

    let mut notices = Vec::new();
    match next {
        DocumentStatus::WaitingApproval => {
            timeline::append(
                conn,
                document_id,
                TimelineEvent::ReadyForApproval,
                "All reviews complete; ready for approval",
                None,
                Some(caller.user_id),
            )?;
            for approver in
                assignments::pending_users(conn, document_id, AssignmentRole::Approver)?
            {
                notices.push(
                    Notice::for_document(
                        approver,
                        &updated,
                        EmailTemplate::ReadyForApproval,
                        format!("Ready for approval: {}", updated.title),
                        format!("{} is ready for your approval", updated.title),
                    )
                    .with("actor_name", actor.to_string()),
                );
            }
        }
        DocumentStatus::Approved => {
            let expiry = updated
                .expiry_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "none".to_string());
            timeline::append(
                conn,
                document_id,
                TimelineEvent::Approved,
                "Document approved",
                Some(format!(
                    "effective {}, expires {expiry}",
                    now.date()
                )),
                Some(caller.user_id),
            )?;
            if updated.created_by != caller.user_id {
                notices.extend(status_notices(&updated, vec![updated.created_by], actor));
            }
        }
        _ => {
            timeline::append(
                conn,
                document_id,
                TimelineEvent::StatusChanged,
                format!("Status changed from {} to {}", current.label(), next.label()),
                None,
                Some(caller.user_id),
            )?;
        }
    }

    info!(document_id = %document_id, from = current.as_str(), to = next.as_str(), "document status advanced");

    Ok((updated, notices))
}

fn lock_document(conn: &mut PgConnection, document_id: Uuid) -> WorkflowResult<Document> {
    documents::table
        .find(document_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| WorkflowError::not_found("document"))
}

fn ensure_open(document: &Document, activity: &str) -> WorkflowResult<()> {
    let status = status_of(document);
    if status.is_open() {
        Ok(())
    } else {
        Err(WorkflowError::conflict(format!(
            "document is {}; {activity} are no longer accepted",
            status.label()
        )))
    }
}

fn approver_assignment(
    conn: &mut PgConnection,
    document_id: Uuid,
    caller: &CallerContext,
) -> WorkflowResult<crate::models::Assignment> {
    assignments::find_for_user(conn, document_id, caller.user_id, AssignmentRole::Approver)?
        .ok_or_else(|| WorkflowError::not_found("approver assignment for caller"))
}

fn ensure_reviews_complete(conn: &mut PgConnection, document_id: Uuid) -> WorkflowResult<()> {
    let reviewers = assignments::role_progress(conn, document_id, AssignmentRole::Reviewer)?;
    if reviewers.is_complete() {
        Ok(())
    } else {
        Err(WorkflowError::conflict(format!(
            "cannot approve until all reviewers complete ({} pending)",
            reviewers.pending()
        )))
    }
}

fn record_approval(
    conn: &mut PgConnection,
    document_id: Uuid,
    approver_id: Uuid,
    decision: ApprovalDecision,
    comment: Option<String>,
) -> QueryResult<usize> {
    diesel::insert_into(document_approvals::table)
        .values(&NewApproval {
            id: Uuid::new_v4(),
            document_id,
            approver_id,
            decision: decision.as_str().to_string(),
            comment,
        })
        .execute(conn)
}

fn ensure_department(conn: &mut PgConnection, department_id: Uuid) -> WorkflowResult<()> {
    ensure_departments(conn, &[department_id])
}

fn ensure_departments(conn: &mut PgConnection, ids: &[Uuid]) -> WorkflowResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: i64 = departments::table
        .filter(departments::id.eq_any(ids))
        .count()
        .get_result(conn)?;
    if found as usize != ids.len() {
        return Err(WorkflowError::validation("unknown department"));
    }
    Ok(())
}

fn ensure_document_type(conn: &mut PgConnection, document_type_id: Uuid) -> WorkflowResult<()> {
    let found: Option<Uuid> = document_types::table
        .find(document_type_id)
        .select(document_types::id)
        .first(conn)
        .optional()?;
    if found.is_none() {
        return Err(WorkflowError::validation("unknown document type"));
    }
    Ok(())
}

fn ensure_users(conn: &mut PgConnection, ids: &[Uuid], role: &str) -> WorkflowResult<()> {
    let ids = assignments::dedupe_preserving_order(ids);
    if ids.is_empty() {
        return Ok(());
    }
    let found: i64 = users::table
        .filter(users::id.eq_any(&ids))
        .count()
        .get_result(conn)?;
    if found as usize != ids.len() {
        return Err(WorkflowError::validation(format!("unknown {role} user")));
    }
    Ok(())
}

fn replace_affected_departments(
    conn: &mut PgConnection,
    document_id: Uuid,
    department_ids: &[Uuid],
) -> QueryResult<()> {
    diesel::delete(
        affected_departments::table.filter(affected_departments::document_id.eq(document_id)),
    )
    .execute(conn)?;

    if department_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<AffectedDepartment> = department_ids
        .iter()
        .map(|department_id| AffectedDepartment {
            document_id,
            department_id: *department_id,
        })
        .collect();
    diesel::insert_into(affected_departments::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

/// Full name of the caller for audit text, falling back to the username.
fn actor_name(conn: &mut PgConnection, caller: &CallerContext) -> QueryResult<String> {
    let full_name: Option<String> = users::table
        .find(caller.user_id)
        .select(users::full_name)
        .first(conn)
        .optional()?;
    Ok(full_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| caller.username.clone()))
}

fn recipients_with_creator(
    conn: &mut PgConnection,
    document: &Document,
    caller: &CallerContext,
) -> QueryResult<Vec<Uuid>> {
    let mut recipients = vec![document.created_by];
    recipients.extend(assignments::pending_users(
        conn,
        document.id,
        AssignmentRole::Approver,
    )?);
    Ok(assignments::dedupe_preserving_order(&recipients)
        .into_iter()
        .filter(|user_id| *user_id != caller.user_id)
        .collect())
}

/// Drops users who are already being told the document awaits their approval.
fn without_ready_notice(users: Vec<Uuid>, notices: &[Notice]) -> Vec<Uuid> {
    users
        .into_iter()
        .filter(|user_id| {
            !notices.iter().any(|notice| {
                notice.user_id == *user_id && notice.template == EmailTemplate::ReadyForApproval
            })
        })
        .collect()
}

fn assignment_notices(
    document: &Document,
    users: &[Uuid],
    role: AssignmentRole,
    actor: &str,
) -> Vec<Notice> {
    let (template, subject) = match role {
        AssignmentRole::Approver => (
            EmailTemplate::AssignmentApprover,
            format!("Approval requested: {}", document.title),
        ),
        _ => (
            EmailTemplate::AssignmentReviewer,
            format!("Review requested: {}", document.title),
        ),
    };

    users
        .iter()
        .map(|user_id| {
            Notice::for_document(
                *user_id,
                document,
                template,
                subject.clone(),
                format!("You were assigned as {role} on {}", document.title),
            )
            .with("actor_name", actor.to_string())
        })
        .collect()
}

fn status_notices(document: &Document, recipients: Vec<Uuid>, actor: &str) -> Vec<Notice> {
    let label = status_of(document).label();
    recipients
        .into_iter()
        .map(|user_id| {
            Notice::for_document(
                user_id,
                document,
                EmailTemplate::StatusChanged,
                format!("{}: {label}", document.title),
                format!("{} is now {label}", document.title),
            )
            .with("actor_name", actor.to_string())
        })
        .collect()
}

fn required_text(value: &str, field: &str) -> WorkflowResult<String> {
    optional_text(Some(value)).ok_or_else(|| WorkflowError::validation(format!("{field} is required")))
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
