use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use pylearn_core::model::User;
use serde::Deserialize;
use serde_json::{Value, json};
use services::{AccountServiceError, ProfileView, SessionContext};

use crate::{
    errors::{ApiError, Result},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<ProfileView>> {
    let profile = state.services.progress().profile(&session).await?;
    Ok(Json(profile))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let Json(payload) = payload?;
    let user = state
        .services
        .accounts()
        .update_profile(&session, &payload.name, &payload.email)
        .await?;
    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload?;
    state
        .services
        .accounts()
        .change_password(&session, &payload.old_password, &payload.new_password)
        .await
        .map_err(|e| match e {
            // The session is fine; only the typed password is wrong.
            AccountServiceError::InvalidCredentials => {
                ApiError::bad_request("Current password is incorrect.")
            }
            other => other.into(),
        })?;
    Ok(Json(
        json!({ "status": "success", "message": "Password changed." }),
    ))
}

/// Delete the caller's account together with its answers and progress.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<StatusCode> {
    state.services.accounts().delete_account(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
