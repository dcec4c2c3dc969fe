//! User administration endpoints. All require a bearer token.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{User, UserRepo};
use crate::http::envelope::Envelope;
use crate::http::error::ApiError;
use crate::http::extractors::{AppJson, AuthUser, ValidId};
use crate::http::server::AppState;

/// Upsert body; `id = 0` creates
#[derive(Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub id: i32,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Required on create; on update an empty value keeps the old one
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct IdRequest {
    pub id: i32,
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Serialize)]
pub struct Saved {
    pub id: i32,
}

/// GET /users
async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Envelope<UserList>, ApiError> {
    let users = UserRepo::new(&state.store).get_all().await?;
    Ok(Envelope::data("success", UserList { users }))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ValidId(id): ValidId,
) -> Result<Envelope<User>, ApiError> {
    let user = UserRepo::new(&state.store).get_one(id).await?;
    Ok(Envelope::data("success", user))
}

/// POST /users - create or update
async fn save_user(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    AppJson(req): AppJson<UserPayload>,
) -> Result<(StatusCode, Envelope<Saved>), ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "email",
            reason: "cannot be empty".to_string(),
        });
    }

    let auth = state.auth_service();
    let users = UserRepo::new(&state.store);

    let id = if req.id == 0 {
        auth.create_user(
            &req.email,
            &req.first_name,
            &req.last_name,
            &req.password,
            req.active,
        )
        .await?
    } else {
        let mut user = users.get_one(req.id).await?;
        let deactivated = user.active && !req.active;

        user.email = req.email;
        user.first_name = req.first_name;
        user.last_name = req.last_name;
        user.active = req.active;

        let new_password = Some(req.password.as_str()).filter(|p| !p.is_empty());
        auth.update_account(&user, new_password, deactivated).await?;
        user.id
    };

    tracing::info!(actor = actor.id, user_id = id, "user saved");
    Ok((StatusCode::ACCEPTED, Envelope::data("Changes saved", Saved { id })))
}

/// DELETE /users - revoke the user's sessions, then delete
async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    AppJson(req): AppJson<IdRequest>,
) -> Result<Envelope<()>, ApiError> {
    state.auth_service().revoke_all_for_user(req.id).await?;
    UserRepo::new(&state.store).delete_by_id(req.id).await?;

    tracing::info!(actor = actor.id, user_id = req.id, "user deleted");
    Ok(Envelope::message("User deleted"))
}

/// POST /users/{id}/logout - deactivate and end every session
async fn log_user_out(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ValidId(id): ValidId,
) -> Result<(StatusCode, Envelope<()>), ApiError> {
    let mut user = UserRepo::new(&state.store).get_one(id).await?;
    user.active = false;
    state.auth_service().update_account(&user, None, true).await?;

    tracing::info!(actor = actor.id, user_id = id, "user logged out and deactivated");
    Ok((
        StatusCode::ACCEPTED,
        Envelope::message("user logged out and set to inactive"),
    ))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(save_user).delete(delete_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/logout", post(log_user_out))
}
