use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::notifications::OutgoingEmail;
use crate::state::AppState;
use crate::workflow::CallerContext;

/// Renders and sends one email immediately, bypassing the queue.
pub async fn send_email(
    State(state): State<AppState>,
    caller: CallerContext,
    Json(email): Json<OutgoingEmail>,
) -> AppResult<Json<Value>> {
    if !caller.can_manage_documents() {
        return Err(AppError::forbidden(
            "only administrators and document controllers can send email directly",
        ));
    }
    if email.to.trim().is_empty() || !email.to.contains('@') {
        return Err(AppError::bad_request("a valid recipient address is required"));
    }

    let rendered = email.render(&state.config.app_base_url);
    match state.mailer.send(&rendered).await {
        Ok(()) => {
            info!(to = %rendered.to, template = %email.template, sent_by = %caller.user_id, "email sent");
            Ok(Json(json!({ "success": true, "message": "Email sent" })))
        }
        Err(err) => {
            warn!(to = %rendered.to, template = %email.template, error = %err, "email send failed");
            Err(AppError::new(
                StatusCode::BAD_GATEWAY,
                "email_failed",
                err.to_string(),
            ))
        }
    }
}
