pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::AppError,
    schema::{roles, user_roles},
    state::AppState,
    workflow::{CallerContext, RoleName},
};

/// Bearer token holder; only the signature and claims are checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}

/// Resolves the caller's role set once per request.
#[async_trait]
impl FromRequestParts<AppState> for CallerContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        let mut conn = state.db()?;
        let roles = load_roles(&mut conn, user.user_id)?;
        Ok(CallerContext::new(user.user_id, user.username, roles))
    }
}

pub fn load_roles(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Vec<RoleName>> {
    let names: Vec<String> = user_roles::table
        .inner_join(roles::table)
        .filter(user_roles::user_id.eq(user_id))
        .select(roles::name)
        .order(roles::name.asc())
        .load(conn)?;

    Ok(names
        .into_iter()
        .filter_map(|name| match name.parse::<RoleName>() {
            Ok(role) => Some(role),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "ignoring unknown role");
                None
            }
        })
        .collect())
}
