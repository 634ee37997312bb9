use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod catalog;
pub mod cron;
pub mod documents;
pub mod email;
pub mod health;
pub mod notifications;
pub mod reports;
pub mod users;

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        warn!(origin = %value, error = %err, "skipping invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/:id",
            get(documents::get_document).patch(documents::update_document),
        )
        .route("/:id/number", post(documents::assign_number))
        .route("/:id/reviews", post(documents::submit_review))
        .route("/:id/approve", post(documents::approve_document))
        .route("/:id/reject", post(documents::reject_document))
        .route("/:id/close", post(documents::close_document))
        .route("/:id/cancel", post(documents::cancel_document))
        .route("/:id/timeline", get(documents::get_timeline))
        .route(
            "/:id/comments",
            get(documents::list_comments).post(documents::add_comment),
        );

    let notifications_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/:id/read", post(notifications::mark_read));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/documents", documents_routes)
        .nest("/api/notifications", notifications_routes)
        .route("/api/users", get(users::list_users))
        .route(
            "/api/departments",
            get(catalog::list_departments).post(catalog::create_department),
        )
        .route(
            "/api/document-types",
            get(catalog::list_document_types).post(catalog::create_document_type),
        )
        .route("/api/reports/summary", get(reports::summary))
        .route("/api/email/send", post(email::send_email))
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/cron/reminders", post(cron::run_reminders).get(cron::run_reminders))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
