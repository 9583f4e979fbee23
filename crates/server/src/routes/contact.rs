use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use pylearn_core::model::ContactMessage;
use serde::Deserialize;

use crate::{errors::Result, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Public contact form; no session required.
pub async fn submit(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let Json(payload) = payload?;
    let stored = state
        .services
        .contacts()
        .submit(
            &payload.name,
            &payload.email,
            payload.subject.as_deref(),
            &payload.message,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
