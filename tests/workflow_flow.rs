mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Months, NaiveDate, NaiveDateTime, Utc};
use common::{acquire_db_lock, read_json, TestApp};
use doctrack::config::AssignmentEditPolicy;
use doctrack::jobs::JOB_SEND_EMAIL;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const PASSWORD: &str = "s3cret";

#[derive(Deserialize)]
struct ActionResponse {
    success: bool,
    message: String,
    document: DocumentInfo,
}

#[derive(Deserialize)]
struct DocumentInfo {
    id: Uuid,
    description: Option<String>,
    status: String,
    number_pending: bool,
    effective_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    rejection_reason: Option<String>,
    cancellation_reason: Option<String>,
}

#[derive(Deserialize)]
struct DocumentDetail {
    document: DocumentInfo,
    assignments: Vec<AssignmentInfo>,
    reviews: Vec<DecisionInfo>,
    approvals: Vec<DecisionInfo>,
    affected_departments: Vec<AffectedInfo>,
}

#[derive(Deserialize)]
struct AssignmentInfo {
    user_id: Uuid,
    role: String,
    is_completed: bool,
    completed_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
struct DecisionInfo {
    user_id: Uuid,
    decision: String,
}

#[derive(Deserialize)]
struct AffectedInfo {
    code: String,
}

#[derive(Deserialize)]
struct TimelineInfo {
    event_type: String,
    event_description: Option<String>,
}

#[derive(Deserialize)]
struct NotificationInfo {
    document_id: Option<Uuid>,
    is_read: bool,
}

struct Actor {
    id: Uuid,
    token: String,
}

struct Fixture {
    department_id: Uuid,
    document_type_id: Uuid,
    controller: Actor,
    creator: Actor,
    reviewer_one: Actor,
    reviewer_two: Actor,
    approver: Actor,
}

async fn actor(app: &TestApp, username: &str, roles: &[&str]) -> Result<Actor> {
    let id = app.insert_user(username, PASSWORD, roles).await?;
    let token = app.login_token(username, PASSWORD).await?;
    Ok(Actor { id, token })
}

async fn fixture(app: &TestApp) -> Result<Fixture> {
    Ok(Fixture {
        department_id: app.insert_department("HR", "Human Resources").await?,
        document_type_id: app.insert_document_type("SOP", "Standard Procedure").await?,
        controller: actor(app, "controller", &["document_controller"]).await?,
        creator: actor(app, "creator", &["staff"]).await?,
        reviewer_one: actor(app, "reviewer1", &["staff"]).await?,
        reviewer_two: actor(app, "reviewer2", &["staff"]).await?,
        approver: actor(app, "approver", &["staff"]).await?,
    })
}

async fn create_document(
    app: &TestApp,
    fx: &Fixture,
    reviewers: &[Uuid],
    approvers: &[Uuid],
) -> Result<ActionResponse> {
    let response = app
        .post_json(
            "/api/documents",
            &json!({
                "title": "Leave Policy",
                "description": "Annual leave rules",
                "department_id": fx.department_id,
                "document_type_id": fx.document_type_id,
                "reviewers": reviewers,
                "approvers": approvers,
                "affected_departments": [fx.department_id],
            }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

async fn review(
    app: &TestApp,
    document_id: Uuid,
    token: &str,
    decision: &str,
    comment: Option<&str>,
) -> Result<hyper::Response<axum::body::Body>> {
    app.post_json(
        &format!("/api/documents/{document_id}/reviews"),
        &json!({ "decision": decision, "comment": comment }),
        Some(token),
    )
    .await
}

async fn detail(app: &TestApp, document_id: Uuid, token: &str) -> Result<DocumentDetail> {
    let response = app
        .get(&format!("/api/documents/{document_id}"), Some(token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

fn completed_at(detail: &DocumentDetail, user_id: Uuid, role: &str) -> Option<NaiveDateTime> {
    detail
        .assignments
        .iter()
        .find(|a| a.user_id == user_id && a.role == role)
        .and_then(|a| a.completed_at)
}

async fn approve(
    app: &TestApp,
    document_id: Uuid,
    token: &str,
) -> Result<hyper::Response<axum::body::Body>> {
    app.post_json(
        &format!("/api/documents/{document_id}/approve"),
        &json!({ "comment": "Looks good" }),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn document_moves_through_review_and_approval() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(
        &app,
        &fx,
        &[fx.reviewer_one.id, fx.reviewer_two.id],
        &[fx.approver.id],
    )
    .await?;
    assert!(created.success);
    assert_eq!(created.document.status, "review");
    assert!(created.document.number_pending);
    let doc_id = created.document.id;

    // Approval is gated on every reviewer finishing.
    let response = approve(&app, doc_id, &fx.approver.token).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = review(&app, doc_id, &fx.reviewer_one.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "review");

    let before = detail(&app, doc_id, &fx.creator.token).await?;
    let first_completion = completed_at(&before, fx.reviewer_one.id, "reviewer");
    assert!(first_completion.is_some());

    // A second completion fails and leaves the first timestamp alone.
    let response = review(&app, doc_id, &fx.reviewer_one.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let after = detail(&app, doc_id, &fx.creator.token).await?;
    assert_eq!(
        completed_at(&after, fx.reviewer_one.id, "reviewer"),
        first_completion
    );
    assert_eq!(after.reviews.len(), 1);

    let response = review(&app, doc_id, &fx.reviewer_two.token, "requested_changes", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = review(
        &app,
        doc_id,
        &fx.reviewer_two.token,
        "requested_changes",
        Some("Clarify carry-over days"),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "waiting_approval");
    assert!(body.message.contains("ready for approval"));

    let response = approve(&app, doc_id, &fx.approver.token).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "approved");
    let effective = body.document.effective_date.expect("effective date set");
    assert_eq!(
        body.document.expiry_date,
        effective.checked_add_months(Months::new(36))
    );

    let response = review(&app, doc_id, &fx.reviewer_one.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .get(&format!("/api/documents/{doc_id}"), Some(&fx.creator.token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let detail: DocumentDetail = read_json(response).await?;
    assert_eq!(detail.document.status, "approved");
    assert_eq!(detail.assignments.len(), 4);
    assert!(detail.assignments.iter().all(|a| a.is_completed));
    assert!(detail
        .assignments
        .iter()
        .any(|a| a.role == "submitter" && a.user_id == fx.creator.id));
    assert_eq!(detail.reviews.len(), 2);
    assert!(detail
        .reviews
        .iter()
        .any(|r| r.user_id == fx.reviewer_two.id && r.decision == "requested_changes"));
    assert_eq!(detail.approvals.len(), 1);
    assert_eq!(detail.approvals[0].decision, "approved");
    assert_eq!(detail.affected_departments.len(), 1);
    assert_eq!(detail.affected_departments[0].code, "HR");

    let response = app
        .get(&format!("/api/documents/{doc_id}/timeline"), Some(&fx.creator.token))
        .await?;
    let timeline: Vec<TimelineInfo> = read_json(response).await?;
    let events: Vec<&str> = timeline.iter().map(|t| t.event_type.as_str()).collect();
    for expected in [
        "created",
        "review_submitted",
        "ready_for_approval",
        "approval_recorded",
        "approved",
    ] {
        assert!(events.contains(&expected), "missing {expected} in {events:?}");
    }

    let close_path = format!("/api/documents/{doc_id}/close");
    let response = app
        .post_json(&close_path, &json!({}), Some(&fx.reviewer_one.token))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(
            &close_path,
            &json!({ "comment": "Published to intranet" }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "closed");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn document_without_reviewers_waits_for_approval() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[], &[fx.approver.id]).await?;
    assert_eq!(created.document.status, "waiting_approval");

    let response = approve(&app, created.document.id, &fx.approver.token).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "approved");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn only_assigned_approvers_can_decide() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[], &[fx.approver.id]).await?;

    let response = approve(&app, created.document.id, &fx.reviewer_one.token).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = review(
        &app,
        created.document.id,
        &fx.approver.token,
        "approved",
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn rejection_is_terminal() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[], &[fx.approver.id, fx.controller.id]).await?;
    let doc_id = created.document.id;
    let reject_path = format!("/api/documents/{doc_id}/reject");

    let response = app
        .post_json(&reject_path, &json!({ "reason": "  " }), Some(&fx.approver.token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &reject_path,
            &json!({ "reason": "Conflicts with labour law" }),
            Some(&fx.approver.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "rejected");
    assert_eq!(
        body.document.rejection_reason.as_deref(),
        Some("Conflicts with labour law")
    );

    // The second approver can no longer act.
    let response = approve(&app, doc_id, &fx.controller.token).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post_json(
            &format!("/api/documents/{doc_id}/cancel"),
            &json!({ "reason": "Obsolete" }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post_json(
            &format!("/api/documents/{doc_id}/close"),
            &json!({}),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn cancel_requires_owner_and_reason() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[fx.reviewer_one.id], &[fx.approver.id]).await?;
    let cancel_path = format!("/api/documents/{}/cancel", created.document.id);

    let response = app
        .post_json(
            &cancel_path,
            &json!({ "reason": "Not mine" }),
            Some(&fx.reviewer_one.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(&cancel_path, &json!({}), Some(&fx.creator.token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &cancel_path,
            &json!({ "reason": "Superseded by group policy" }),
            Some(&fx.controller.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "cancel");
    assert_eq!(
        body.document.cancellation_reason.as_deref(),
        Some("Superseded by group policy")
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn assignees_are_notified_by_app_and_email() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(
        &app,
        &fx,
        &[fx.reviewer_one.id, fx.reviewer_two.id],
        &[fx.approver.id],
    )
    .await?;

    let queued = app.jobs_by_type(JOB_SEND_EMAIL).await?;
    assert_eq!(queued.len(), 3);

    let processed = app.drain_jobs().await?;
    assert_eq!(processed, 3);

    let mut recipients: Vec<String> = app
        .mailer()
        .sent()
        .await
        .into_iter()
        .map(|email| email.to)
        .collect();
    recipients.sort();
    assert_eq!(
        recipients,
        vec![
            "approver@example.test".to_string(),
            "reviewer1@example.test".to_string(),
            "reviewer2@example.test".to_string(),
        ]
    );

    let response = app
        .get("/api/notifications?unread=true", Some(&fx.reviewer_one.token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let inbox: Vec<NotificationInfo> = read_json(response).await?;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].document_id, Some(created.document.id));
    assert!(!inbox[0].is_read);

    let response = app
        .post_json("/api/notifications/read-all", &json!({}), Some(&fx.reviewer_one.token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get("/api/notifications?unread=true", Some(&fx.reviewer_one.token))
        .await?;
    let inbox: Vec<NotificationInfo> = read_json(response).await?;
    assert!(inbox.is_empty());

    // The creator hears about the review but not about their own actions.
    let response = app.get("/api/notifications", Some(&fx.creator.token)).await?;
    let inbox: Vec<NotificationInfo> = read_json(response).await?;
    assert!(inbox.is_empty());

    review(&app, created.document.id, &fx.reviewer_one.token, "approved", None).await?;
    let response = app.get("/api/notifications", Some(&fx.creator.token)).await?;
    let inbox: Vec<NotificationInfo> = read_json(response).await?;
    assert_eq!(inbox.len(), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn editing_reviewers_reroutes_the_document() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(
        &app,
        &fx,
        &[fx.reviewer_one.id, fx.reviewer_two.id],
        &[fx.approver.id],
    )
    .await?;
    let doc_id = created.document.id;

    review(&app, doc_id, &fx.reviewer_one.token, "approved", None).await?;

    // Dropping the outstanding reviewer leaves only completed reviews.
    let response = app
        .patch_json(
            &format!("/api/documents/{doc_id}"),
            &json!({ "reviewers": [fx.reviewer_one.id] }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "waiting_approval");

    let response = app
        .patch_json(
            &format!("/api/documents/{doc_id}"),
            &json!({ "title": "Hijacked" }),
            Some(&fx.reviewer_two.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn reminder_sweep_requires_cron_secret() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let response = app
        .post_json(
            "/api/documents",
            &json!({
                "title": "Overdue Policy",
                "department_id": fx.department_id,
                "document_type_id": fx.document_type_id,
                "target_approval_date": yesterday,
                "reviewers": [fx.reviewer_one.id],
                "approvers": [fx.approver.id],
            }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_json("/api/cron/reminders", &json!({}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json("/api/cron/reminders", &json!({}), Some("cron-secreT"))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    #[derive(Deserialize)]
    struct SweepResult {
        scanned: usize,
        overdue: usize,
        dispatched: usize,
    }

    let response = app
        .post_json("/api/cron/reminders", &json!({}), Some("cron-secret"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let sweep: SweepResult = read_json(response).await?;
    assert_eq!(sweep.scanned, 1);
    assert_eq!(sweep.overdue, 1);
    // Pending reviewer plus the creator.
    assert_eq!(sweep.dispatched, 2);

    app.cleanup().await?;
    Ok(())
}

/// Reviewer one finishes, then the creator drops them from the list.
async fn remove_completed_reviewer(app: &TestApp, fx: &Fixture) -> Result<(Uuid, Option<NaiveDateTime>)> {
    let created = create_document(
        app,
        fx,
        &[fx.reviewer_one.id, fx.reviewer_two.id],
        &[fx.approver.id],
    )
    .await?;
    let doc_id = created.document.id;

    let response = review(app, doc_id, &fx.reviewer_one.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let completion = completed_at(
        &detail(app, doc_id, &fx.creator.token).await?,
        fx.reviewer_one.id,
        "reviewer",
    );
    assert!(completion.is_some());

    let response = app
        .patch_json(
            &format!("/api/documents/{doc_id}"),
            &json!({ "reviewers": [fx.reviewer_two.id] }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "review");

    Ok((doc_id, completion))
}

#[tokio::test]
async fn removed_completed_reviewer_is_kept_for_history() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::with_edit_policy(AssignmentEditPolicy::Preserve).await?;
    let fx = fixture(&app).await?;

    let (doc_id, completion) = remove_completed_reviewer(&app, &fx).await?;

    let current = detail(&app, doc_id, &fx.creator.token).await?;
    let reviewers: Vec<&AssignmentInfo> = current
        .assignments
        .iter()
        .filter(|a| a.role == "reviewer")
        .collect();
    assert_eq!(reviewers.len(), 2);
    assert_eq!(
        completed_at(&current, fx.reviewer_one.id, "reviewer"),
        completion
    );

    let response = app
        .get(&format!("/api/documents/{doc_id}/timeline"), Some(&fx.creator.token))
        .await?;
    let timeline: Vec<TimelineInfo> = read_json(response).await?;
    assert!(timeline.iter().any(|t| t.event_type == "updated"
        && t.event_description.as_deref() == Some("1 completed assignment(s) kept for history")));

    // The kept completion still counts once the remaining reviewer finishes.
    let response = review(&app, doc_id, &fx.reviewer_two.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "waiting_approval");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn removed_completed_reviewer_is_deleted_when_configured() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::with_edit_policy(AssignmentEditPolicy::Delete).await?;
    let fx = fixture(&app).await?;

    let (doc_id, _) = remove_completed_reviewer(&app, &fx).await?;

    let current = detail(&app, doc_id, &fx.creator.token).await?;
    assert!(!current
        .assignments
        .iter()
        .any(|a| a.user_id == fx.reviewer_one.id));
    // The review itself stays on record.
    assert_eq!(current.reviews.len(), 1);

    let response = app
        .get(&format!("/api/documents/{doc_id}/timeline"), Some(&fx.creator.token))
        .await?;
    let timeline: Vec<TimelineInfo> = read_json(response).await?;
    assert!(timeline
        .iter()
        .all(|t| t.event_description.as_deref() != Some("1 completed assignment(s) kept for history")));

    let response = review(&app, doc_id, &fx.reviewer_two.token, "approved", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "waiting_approval");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn approver_added_by_edit_is_notified_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[], &[]).await?;
    assert_eq!(created.document.status, "initiation");
    let doc_id = created.document.id;

    let response = app
        .patch_json(
            &format!("/api/documents/{doc_id}"),
            &json!({ "approvers": [fx.approver.id] }),
            Some(&fx.creator.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.status, "waiting_approval");

    let response = app
        .get("/api/notifications", Some(&fx.approver.token))
        .await?;
    let inbox: Vec<NotificationInfo> = read_json(response).await?;
    assert_eq!(inbox.len(), 1);
    assert_eq!(app.jobs_by_type(JOB_SEND_EMAIL).await?.len(), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn edited_description_is_trimmed_and_can_be_cleared() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let fx = fixture(&app).await?;

    let created = create_document(&app, &fx, &[fx.reviewer_one.id], &[fx.approver.id]).await?;
    let path = format!("/api/documents/{}", created.document.id);

    let response = app
        .patch_json(&path, &json!({ "description": "  Revised rules  " }), Some(&fx.creator.token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.description.as_deref(), Some("Revised rules"));

    let response = app
        .patch_json(&path, &json!({ "title": "Leave Policy v2" }), Some(&fx.creator.token))
        .await?;
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.description.as_deref(), Some("Revised rules"));

    let response = app
        .patch_json(&path, &json!({ "description": " " }), Some(&fx.creator.token))
        .await?;
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.description, None);

    app.cleanup().await?;
    Ok(())
}
