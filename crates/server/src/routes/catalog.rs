use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
};
use pylearn_core::model::{LessonId, ModuleId};
use services::{LessonDetail, ModuleDetail, ModuleOverview, SessionContext};

use crate::{errors::Result, state::AppState};

/// Modules with the caller's score against the maximum attainable.
pub async fn list_modules(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<ModuleOverview>>> {
    let modules = state.services.progress().module_overviews(&session).await?;
    Ok(Json(modules))
}

pub async fn module_detail(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: std::result::Result<Path<ModuleId>, PathRejection>,
) -> Result<Json<ModuleDetail>> {
    let Path(id) = id?;
    let detail = state.services.progress().module_detail(&session, id).await?;
    Ok(Json(detail))
}

/// Lesson content with its questions; answers stay hidden.
pub async fn lesson_detail(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: std::result::Result<Path<LessonId>, PathRejection>,
) -> Result<Json<LessonDetail>> {
    let Path(id) = id?;
    let detail = state.services.progress().lesson_detail(&session, id).await?;
    Ok(Json(detail))
}
