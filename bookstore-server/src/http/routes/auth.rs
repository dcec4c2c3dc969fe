//! Session endpoints: login, logout, token validation

use std::sync::Arc;

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::auth::IssuedToken;
use crate::db::User;
use crate::http::envelope::Envelope;
use crate::http::error::ApiError;
use crate::http::extractors::AppJson;
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: IssuedToken,
    pub user: User,
}

/// POST /login - check credentials and issue a session token
async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(creds): AppJson<Credentials>,
) -> Result<Envelope<LoginResponse>, ApiError> {
    let auth = state.auth_service();
    let user = auth.authenticate(&creds.email, &creds.password).await?;
    let token = auth.issue_token(&user, state.auth.token_ttl).await?;

    Ok(Envelope::data("logged in", LoginResponse { token, user }))
}

/// POST /logout - revoke the presented token
async fn logout(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<TokenRequest>,
) -> Result<Envelope<()>, ApiError> {
    state.auth_service().revoke(&req.token).await?;
    Ok(Envelope::message("logged out"))
}

/// POST /validate-token - always answers with a boolean
async fn validate_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<TokenRequest>,
) -> Envelope<bool> {
    let valid = match state.auth_service().validate(&req.token).await {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!(error = %e, "token validation failed");
            false
        }
    };
    Envelope::data("", valid)
}

/// Session routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/validate-token", post(validate_token))
}
