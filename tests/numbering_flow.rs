mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp};
use diesel::prelude::*;
use doctrack::models::NewDocument;
use doctrack::schema::documents;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const PASSWORD: &str = "s3cret";

#[derive(Deserialize)]
struct ActionResponse {
    document: DocumentInfo,
}

#[derive(Deserialize)]
struct DocumentInfo {
    id: Uuid,
    document_number: String,
    number_pending: bool,
}

struct Setup {
    department_id: Uuid,
    document_type_id: Uuid,
    staff_id: Uuid,
    staff_token: String,
    controller_token: String,
}

async fn setup(app: &TestApp) -> Result<Setup> {
    let department_id = app.insert_department("HR", "Human Resources").await?;
    let document_type_id = app.insert_document_type("SOP", "Standard Procedure").await?;
    let staff_id = app.insert_user("staff", PASSWORD, &["staff"]).await?;
    app.insert_user("controller", PASSWORD, &["document_controller"])
        .await?;
    Ok(Setup {
        department_id,
        document_type_id,
        staff_id,
        staff_token: app.login_token("staff", PASSWORD).await?,
        controller_token: app.login_token("controller", PASSWORD).await?,
    })
}

async fn create(app: &TestApp, setup: &Setup, title: &str) -> Result<Uuid> {
    let response = app
        .post_json(
            "/api/documents",
            &json!({
                "title": title,
                "department_id": setup.department_id,
                "document_type_id": setup.document_type_id,
            }),
            Some(&setup.staff_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: ActionResponse = read_json(response).await?;
    assert!(body.document.number_pending);
    Ok(body.document.id)
}

/// Inserts a document that already carries `number`.
async fn seed_numbered(app: &TestApp, setup: &Setup, number: &str) -> Result<()> {
    let row = NewDocument {
        id: Uuid::new_v4(),
        document_number: number.to_string(),
        title: format!("Seeded {number}"),
        description: None,
        status: "approved".to_string(),
        version: "1.0".to_string(),
        department_id: setup.department_id,
        document_type_id: setup.document_type_id,
        target_approval_date: None,
        created_by: setup.staff_id,
    };
    app.with_conn(move |conn| {
        diesel::insert_into(documents::table)
            .values(&row)
            .execute(conn)
            .context("failed to seed document")?;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn automatic_numbers_continue_the_sequence() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let setup = setup(&app).await?;

    seed_numbered(&app, &setup, "MRT-HRX-SOP-002").await?;
    seed_numbered(&app, &setup, "MRT-HRX-SOP-005").await?;
    seed_numbered(&app, &setup, "MRT-ITX-SOP-009").await?;

    let doc_id = create(&app, &setup, "Onboarding").await?;
    let path = format!("/api/documents/{doc_id}/number");

    let response = app
        .post_json(&path, &json!({}), Some(&setup.controller_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.document_number, "MRT-HRX-SOP-006");
    assert!(!body.document.number_pending);

    // A number is assigned once.
    let response = app
        .post_json(&path, &json!({}), Some(&setup.controller_token))
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn manual_numbers_are_validated_and_unique() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let setup = setup(&app).await?;

    seed_numbered(&app, &setup, "MRT-HRX-SOP-006").await?;
    let doc_id = create(&app, &setup, "Offboarding").await?;
    let path = format!("/api/documents/{doc_id}/number");

    let response = app
        .post_json(
            &path,
            &json!({ "document_number": "mrt-hrx-sop-006" }),
            Some(&setup.controller_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post_json(
            &path,
            &json!({ "document_number": "HR-1" }),
            Some(&setup.controller_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &path,
            &json!({ "document_number": " mrt-hrx-sop-100 " }),
            Some(&setup.controller_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ActionResponse = read_json(response).await?;
    assert_eq!(body.document.document_number, "MRT-HRX-SOP-100");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn staff_cannot_assign_numbers() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let setup = setup(&app).await?;

    let doc_id = create(&app, &setup, "Expenses").await?;
    let response = app
        .post_json(
            &format!("/api/documents/{doc_id}/number"),
            &json!({}),
            Some(&setup.staff_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
