use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::reports::{self, SummaryReport};
use crate::state::AppState;
use crate::workflow::CallerContext;

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub department_id: Option<Uuid>,
}

pub async fn summary(
    State(state): State<AppState>,
    _caller: CallerContext,
    Query(params): Query<SummaryQuery>,
) -> AppResult<Json<SummaryReport>> {
    let mut conn = state.db()?;
    let rows = reports::load_rows(&mut conn, params.department_id)?;
    Ok(Json(reports::summarize(&rows, Utc::now().date_naive())))
}
