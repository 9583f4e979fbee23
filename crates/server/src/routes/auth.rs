use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use pylearn_core::model::User;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{auth::SessionToken, errors::Result, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Self-service sign-up; never creates an administrator.
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    let Json(payload) = payload?;
    let user = state
        .services
        .accounts()
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let login = state
        .services
        .accounts()
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(LoginResponse {
        token: login.token,
        expires_at: login.session.expires_at,
        user: login.user,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Json<Value> {
    state.services.accounts().logout(&token);
    Json(json!({ "status": "success", "message": "Logged out." }))
}

/// Reset a forgotten password by email. Every open session of the account
/// is closed.
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload?;
    state
        .services
        .accounts()
        .reset_password(&payload.email, &payload.new_password)
        .await?;
    Ok(Json(
        json!({ "status": "success", "message": "Password has been reset." }),
    ))
}
