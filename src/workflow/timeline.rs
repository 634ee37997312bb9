use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::models::{NewTimelineEntry, TimelineEntry};
use crate::schema::document_timeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    Created,
    Updated,
    StatusChanged,
    ReviewSubmitted,
    ReadyForApproval,
    ApprovalRecorded,
    Approved,
    Rejected,
    Closed,
    Cancelled,
    NumberAssigned,
    CommentAdded,
}

impl TimelineEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEvent::Created => "created",
            TimelineEvent::Updated => "updated",
            TimelineEvent::StatusChanged => "status_changed",
            TimelineEvent::ReviewSubmitted => "review_submitted",
            TimelineEvent::ReadyForApproval => "ready_for_approval",
            TimelineEvent::ApprovalRecorded => "approval_recorded",
            TimelineEvent::Approved => "approved",
            TimelineEvent::Rejected => "rejected",
            TimelineEvent::Closed => "closed",
            TimelineEvent::Cancelled => "cancelled",
            TimelineEvent::NumberAssigned => "number_assigned",
            TimelineEvent::CommentAdded => "comment_added",
        }
    }
}

/// Appends one immutable audit row. Entries are stamped with the wall clock
/// rather than the transaction start so several events written by one action
/// keep their order.
pub fn append(
    conn: &mut PgConnection,
    document_id: Uuid,
    event: TimelineEvent,
    title: impl Into<String>,
    description: Option<String>,
    performed_by: Option<Uuid>,
) -> QueryResult<()> {
    let entry = NewTimelineEntry {
        id: Uuid::new_v4(),
        document_id,
        event_type: event.as_str().to_string(),
        event_title: title.into(),
        event_description: description,
        performed_by,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(document_timeline::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

pub fn list(conn: &mut PgConnection, document_id: Uuid) -> QueryResult<Vec<TimelineEntry>> {
    document_timeline::table
        .filter(document_timeline::document_id.eq(document_id))
        .order((
            document_timeline::created_at.asc(),
            document_timeline::id.asc(),
        ))
        .load(conn)
}
