use std::collections::HashMap;

use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::User;
use crate::schema::{roles, user_roles, users};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub department_id: Option<Uuid>,
    pub roles: Vec<String>,
}

/// Everyone who can be picked as a reviewer or approver.
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    let mut conn = state.db()?;

    let rows: Vec<User> = users::table.order(users::full_name.asc()).load(&mut conn)?;
    let role_rows: Vec<(Uuid, String)> = user_roles::table
        .inner_join(roles::table)
        .select((user_roles::user_id, roles::name))
        .order(roles::name.asc())
        .load(&mut conn)?;

    let mut roles_by_user: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (user_id, role) in role_rows {
        roles_by_user.entry(user_id).or_default().push(role);
    }

    Ok(Json(
        rows.into_iter()
            .map(|user| UserSummary {
                roles: roles_by_user.remove(&user.id).unwrap_or_default(),
                id: user.id,
                username: user.username,
                full_name: user.full_name,
                email: user.email,
                department_id: user.department_id,
            })
            .collect(),
    ))
}
