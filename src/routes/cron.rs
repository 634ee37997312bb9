use axum::{extract::State, Json};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};
use crate::notifications;
use crate::reminders::{self, ScanSummary};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReminderRunResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ScanSummary,
    pub dispatched: usize,
}

/// Externally scheduled reminder sweep. When `CRON_SECRET` is configured the
/// caller must present it as a bearer token.
pub async fn run_reminders(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> AppResult<Json<ReminderRunResponse>> {
    if let Some(secret) = state.config.cron_secret.as_deref() {
        let presented = bearer.as_ref().map(|TypedHeader(Authorization(b))| b.token());
        if !presented.is_some_and(|token| secrets_match(token, secret)) {
            return Err(AppError::unauthorized());
        }
    }

    let mut conn = state.db()?;
    let summary = reminders::scan(&mut conn, Utc::now().date_naive())?;
    let dispatched = notifications::dispatch(&mut conn, &summary.notices);

    Ok(Json(ReminderRunResponse {
        success: true,
        summary,
        dispatched,
    }))
}

/// Compares fixed-length digests so the running time does not depend on
/// where the inputs first differ.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
