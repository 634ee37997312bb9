use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Approval, Assignment, Comment, Document, Review, TimelineEntry},
    notifications,
    schema::{
        affected_departments, departments, document_approvals, document_assignments,
        document_comments, document_reviews, documents, users,
    },
    state::AppState,
    workflow::{
        self, numbering, status::status_of, timeline, CallerContext, DocumentInput,
        DocumentPatch, DocumentStatus, Outcome, ReviewDecision,
    },
};

#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    /// Comma-separated statuses, storage form or display label.
    pub status: Option<String>,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub mine: bool,
    #[serde(default)]
    pub assigned: bool,
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub document_number: String,
    pub number_pending: bool,
    pub title: String,
    pub description: Option<String>,
    pub status: DocumentStatus,
    pub status_label: &'static str,
    pub version: String,
    pub department_id: Uuid,
    pub document_type_id: Uuid,
    pub target_approval_date: Option<NaiveDate>,
    pub approved_at: Option<NaiveDateTime>,
    pub published_at: Option<NaiveDateTime>,
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub closing_comment: Option<String>,
    pub closed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let status = status_of(&doc);
        Self {
            id: doc.id,
            number_pending: numbering::is_pending(&doc.document_number),
            document_number: doc.document_number,
            title: doc.title,
            description: doc.description,
            status,
            status_label: status.label(),
            version: doc.version,
            department_id: doc.department_id,
            document_type_id: doc.document_type_id,
            target_approval_date: doc.target_approval_date,
            approved_at: doc.approved_at,
            published_at: doc.published_at,
            effective_date: doc.effective_date,
            expiry_date: doc.expiry_date,
            rejection_reason: doc.rejection_reason,
            cancellation_reason: doc.cancellation_reason,
            closing_comment: doc.closing_comment,
            closed_at: doc.closed_at,
            cancelled_at: doc.cancelled_at,
            created_by: doc.created_by,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Uniform success shape for workflow actions.
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub document: DocumentResponse,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub role: String,
    pub sequence_order: i32,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub assignment_notes: Option<String>,
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub decision: String,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Review> for DecisionResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            user_id: review.reviewer_id,
            decision: review.decision,
            comment: review.comment,
            created_at: review.created_at,
        }
    }
}

impl From<Approval> for DecisionResponse {
    fn from(approval: Approval) -> Self {
        Self {
            id: approval.id,
            user_id: approval.approver_id,
            decision: approval.decision,
            comment: approval.comment,
            created_at: approval.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub id: Uuid,
    pub event_type: String,
    pub event_title: String,
    pub event_description: Option<String>,
    pub performed_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl From<TimelineEntry> for TimelineResponse {
    fn from(entry: TimelineEntry) -> Self {
        Self {
            id: entry.id,
            event_type: entry.event_type,
            event_title: entry.event_title,
            event_description: entry.event_description,
            performed_by: entry.performed_by,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct AffectedDepartmentResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub document: DocumentResponse,
    pub assignments: Vec<AssignmentResponse>,
    pub reviews: Vec<DecisionResponse>,
    pub approvals: Vec<DecisionResponse>,
    pub affected_departments: Vec<AffectedDepartmentResponse>,
    pub timeline: Vec<TimelineResponse>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub body: String,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct AssignNumberRequest {
    pub document_number: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct NewCommentRequest {
    #[serde(default)]
    pub body: String,
}

/// Dispatches the outcome's notices now that its transaction has committed.
fn respond(conn: &mut PgConnection, outcome: Outcome) -> Json<ActionResponse> {
    notifications::dispatch(conn, &outcome.notices);
    Json(ActionResponse {
        success: true,
        message: outcome.message,
        document: outcome.document.into(),
    })
}

fn parse_statuses(raw: &str) -> AppResult<Vec<&'static str>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<DocumentStatus>()
                .map(|status| status.as_str())
                .map_err(AppError::bad_request)
        })
        .collect()
}

pub async fn list_documents(
    State(state): State<AppState>,
    caller: CallerContext,
    Query(params): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let mut conn = state.db()?;
    let mut query = documents::table.into_boxed();

    if let Some(raw) = params.status.as_deref() {
        let statuses = parse_statuses(raw)?;
        if !statuses.is_empty() {
            query = query.filter(documents::status.eq_any(statuses));
        }
    }
    if let Some(department_id) = params.department_id {
        query = query.filter(documents::department_id.eq(department_id));
    }
    if params.mine {
        query = query.filter(documents::created_by.eq(caller.user_id));
    }
    if params.assigned {
        let assigned_ids = document_assignments::table
            .filter(document_assignments::user_id.eq(caller.user_id))
            .filter(document_assignments::role.ne(workflow::AssignmentRole::Submitter.as_str()))
            .select(document_assignments::document_id);
        query = query.filter(documents::id.eq_any(assigned_ids));
    }
    if let Some(text) = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        let pattern = format!("%{}%", text.replace('%', "\\%").replace('_', "\\_"));
        query = query.filter(
            documents::title
                .ilike(pattern.clone())
                .or(documents::document_number.ilike(pattern)),
        );
    }

    let docs: Vec<Document> = query
        .order(documents::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    _caller: CallerContext,
) -> AppResult<Json<DocumentDetailResponse>> {
    let mut conn = state.db()?;

    let doc: Document = documents::table.find(document_id).first(&mut conn)?;

    let assignment_rows: Vec<(Assignment, String)> = document_assignments::table
        .inner_join(users::table)
        .filter(document_assignments::document_id.eq(document_id))
        .order((
            document_assignments::role.asc(),
            document_assignments::sequence_order.asc(),
        ))
        .select((document_assignments::all_columns, users::full_name))
        .load(&mut conn)?;

    let reviews: Vec<Review> = document_reviews::table
        .filter(document_reviews::document_id.eq(document_id))
        .order(document_reviews::created_at.asc())
        .load(&mut conn)?;
    let approvals: Vec<Approval> = document_approvals::table
        .filter(document_approvals::document_id.eq(document_id))
        .order(document_approvals::created_at.asc())
        .load(&mut conn)?;

    let affected: Vec<(Uuid, String, String)> = affected_departments::table
        .inner_join(departments::table)
        .filter(affected_departments::document_id.eq(document_id))
        .order(departments::name.asc())
        .select((departments::id, departments::code, departments::name))
        .load(&mut conn)?;

    let timeline_entries = timeline::list(&mut conn, document_id)?;

    Ok(Json(DocumentDetailResponse {
        document: doc.into(),
        assignments: assignment_rows
            .into_iter()
            .map(|(assignment, user_name)| AssignmentResponse {
                id: assignment.id,
                user_id: assignment.user_id,
                user_name: Some(user_name),
                role: assignment.role,
                sequence_order: assignment.sequence_order,
                is_completed: assignment.is_completed,
                completed_at: assignment.completed_at,
                assignment_notes: assignment.assignment_notes,
            })
            .collect(),
        reviews: reviews.into_iter().map(DecisionResponse::from).collect(),
        approvals: approvals.into_iter().map(DecisionResponse::from).collect(),
        affected_departments: affected
            .into_iter()
            .map(|(id, code, name)| AffectedDepartmentResponse { id, code, name })
            .collect(),
        timeline: timeline_entries
            .into_iter()
            .map(TimelineResponse::from)
            .collect(),
    }))
}

pub async fn create_document(
    State(state): State<AppState>,
    caller: CallerContext,
    Json(payload): Json<DocumentInput>,
) -> AppResult<(StatusCode, Json<ActionResponse>)> {
    let mut conn = state.db()?;
    let outcome = workflow::create_document(&mut conn, &caller, payload)?;
    Ok((StatusCode::CREATED, respond(&mut conn, outcome)))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(patch): Json<DocumentPatch>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::update_document(
        &mut conn,
        &state.workflow_settings(),
        &caller,
        document_id,
        patch,
    )?;
    Ok(respond(&mut conn, outcome))
}

pub async fn assign_number(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<AssignNumberRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::assign_document_number(
        &mut conn,
        &state.workflow_settings(),
        &caller,
        document_id,
        payload.document_number.as_deref(),
    )?;
    Ok(respond(&mut conn, outcome))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::submit_review(
        &mut conn,
        &state.workflow_settings(),
        &caller,
        document_id,
        payload.decision,
        payload.comment,
    )?;
    Ok(respond(&mut conn, outcome))
}

pub async fn approve_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<CommentRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::approve_document(
        &mut conn,
        &state.workflow_settings(),
        &caller,
        document_id,
        payload.comment,
    )?;
    Ok(respond(&mut conn, outcome))
}

pub async fn reject_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<ReasonRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::reject_document(&mut conn, &caller, document_id, &payload.reason)?;
    Ok(respond(&mut conn, outcome))
}

pub async fn close_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<CommentRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::close_document(&mut conn, &caller, document_id, payload.comment)?;
    Ok(respond(&mut conn, outcome))
}

pub async fn cancel_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<ReasonRequest>,
) -> AppResult<Json<ActionResponse>> {
    let mut conn = state.db()?;
    let outcome = workflow::cancel_document(&mut conn, &caller, document_id, &payload.reason)?;
    Ok(respond(&mut conn, outcome))
}

pub async fn get_timeline(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    _caller: CallerContext,
) -> AppResult<Json<Vec<TimelineResponse>>> {
    let mut conn = state.db()?;
    let exists: Option<Uuid> = documents::table
        .find(document_id)
        .select(documents::id)
        .first(&mut conn)
        .optional()?;
    if exists.is_none() {
        return Err(AppError::not_found());
    }

    let entries = timeline::list(&mut conn, document_id)?;
    Ok(Json(entries.into_iter().map(TimelineResponse::from).collect()))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    _caller: CallerContext,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let mut conn = state.db()?;

    let comments: Vec<Comment> = document_comments::table
        .filter(document_comments::document_id.eq(document_id))
        .order(document_comments::created_at.asc())
        .load(&mut conn)?;

    let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    let names: HashMap<Uuid, String> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select((users::id, users::full_name))
        .load::<(Uuid, String)>(&mut conn)?
        .into_iter()
        .collect();

    Ok(Json(
        comments
            .into_iter()
            .map(|comment| CommentResponse {
                author_name: names.get(&comment.author_id).cloned(),
                id: comment.id,
                author_id: comment.author_id,
                body: comment.body,
                created_at: comment.created_at,
            })
            .collect(),
    ))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    caller: CallerContext,
    Json(payload): Json<NewCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let mut conn = state.db()?;
    let comment = workflow::add_comment(&mut conn, &caller, document_id, &payload.body)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            author_id: comment.author_id,
            author_name: None,
            body: comment.body,
            created_at: comment.created_at,
        }),
    ))
}
