use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Department, DocumentType, NewDepartment, NewDocumentType};
use crate::schema::{departments, document_types};
use crate::state::AppState;
use crate::workflow::{CallerContext, WorkflowError};

const MAX_CODE_LEN: usize = 10;

#[derive(Deserialize)]
pub struct CatalogEntryRequest {
    pub code: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct CatalogEntryResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<Department> for CatalogEntryResponse {
    fn from(value: Department) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

impl From<DocumentType> for CatalogEntryResponse {
    fn from(value: DocumentType) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

/// Codes feed document number segments, so they are kept short and alphabetic.
fn validate_entry(payload: &CatalogEntryRequest) -> AppResult<(String, String)> {
    let code = payload.code.trim().to_ascii_uppercase();
    let name = payload.name.trim().to_string();

    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(AppError::bad_request(format!(
            "code must be 1 to {MAX_CODE_LEN} characters"
        )));
    }
    if !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(AppError::bad_request("code may only contain letters"));
    }
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    Ok((code, name))
}

fn require_manager(caller: &CallerContext) -> AppResult<()> {
    if caller.can_manage_documents() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "only administrators and document controllers can manage the catalog",
        ))
    }
}

pub async fn list_departments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CatalogEntryResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Department> = departments::table
        .order(departments::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn create_department(
    State(state): State<AppState>,
    caller: CallerContext,
    Json(payload): Json<CatalogEntryRequest>,
) -> AppResult<(StatusCode, Json<CatalogEntryResponse>)> {
    require_manager(&caller)?;
    let (code, name) = validate_entry(&payload)?;
    let mut conn = state.db()?;

    let department: Department = diesel::insert_into(departments::table)
        .values(&NewDepartment {
            id: Uuid::new_v4(),
            code,
            name,
        })
        .get_result(&mut conn)
        .map_err(WorkflowError::from)?;

    Ok((StatusCode::CREATED, Json(department.into())))
}

pub async fn list_document_types(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CatalogEntryResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<DocumentType> = document_types::table
        .order(document_types::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn create_document_type(
    State(state): State<AppState>,
    caller: CallerContext,
    Json(payload): Json<CatalogEntryRequest>,
) -> AppResult<(StatusCode, Json<CatalogEntryResponse>)> {
    require_manager(&caller)?;
    let (code, name) = validate_entry(&payload)?;
    let mut conn = state.db()?;

    let document_type: DocumentType = diesel::insert_into(document_types::table)
        .values(&NewDocumentType {
            id: Uuid::new_v4(),
            code,
            name,
        })
        .get_result(&mut conn)
        .map_err(WorkflowError::from)?;

    Ok((StatusCode::CREATED, Json(document_type.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, name: &str) -> CatalogEntryRequest {
        CatalogEntryRequest {
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn codes_are_uppercased() {
        let (code, name) = validate_entry(&entry(" it ", " Information Technology ")).unwrap();
        assert_eq!(code, "IT");
        assert_eq!(name, "Information Technology");
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(validate_entry(&entry("", "Quality")).is_err());
        assert!(validate_entry(&entry("Q-A", "Quality")).is_err());
        assert!(validate_entry(&entry("QA1", "Quality")).is_err());
        assert!(validate_entry(&entry("QUALITYASSURANCE", "Quality")).is_err());
        assert!(validate_entry(&entry("QA", " ")).is_err());
    }
}
