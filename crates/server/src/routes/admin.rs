use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{delete, get, post},
};
use pylearn_core::model::{
    ContactMessage, Lesson, LessonId, McqId, McqOption, MessageId, Module, ModuleId,
    MultipleChoiceQuestion, Question, QuestionId, User, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use services::{McqInput, SessionContext, UserProgress};

use crate::{errors::Result, state::AppState};

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type IdPath<T> = std::result::Result<Path<T>, PathRejection>;

/// Administrator routes, mounted under `/admin`. Every handler passes the
/// session to a service that refuses non-admins.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/modules", get(list_modules).post(create_module))
        .route("/modules/:id", delete(delete_module))
        .route("/lessons", get(list_lessons).post(create_lesson))
        .route("/lessons/:id", delete(delete_lesson))
        .route("/lessons/:id/document", post(set_lesson_document))
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/:id", delete(delete_question))
        .route("/mcqs", get(list_mcqs).post(create_mcq))
        .route("/mcqs/:id", delete(delete_mcq))
        .route("/users", get(list_users).post(add_user))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/password", post(set_user_password))
        .route("/admins", post(add_admin))
        .route("/messages", get(list_messages))
        .route("/messages/:id", delete(delete_message))
        .route("/messages/:id/toggle_read", post(toggle_message_read))
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

/// Short-answer question including its accepted answer.
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub prompt: String,
    pub answer: String,
    pub points: u32,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            lesson_id: q.lesson_id,
            prompt: q.prompt,
            answer: q.answer,
            points: q.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct McqResponse {
    pub id: McqId,
    pub lesson_id: LessonId,
    pub prompt: String,
    pub options: BTreeMap<McqOption, String>,
    pub correct_option: McqOption,
    pub points: u32,
}

impl From<MultipleChoiceQuestion> for McqResponse {
    fn from(m: MultipleChoiceQuestion) -> Self {
        let options = McqOption::ALL
            .into_iter()
            .map(|slot| (slot, m.option(slot).to_string()))
            .collect();
        Self {
            id: m.id,
            lesson_id: m.lesson_id,
            prompt: m.prompt,
            options,
            correct_option: m.correct_option,
            points: m.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub unread: u32,
    pub messages: Vec<ContactMessage>,
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub module_id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub document_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LessonDocumentRequest {
    #[serde(default)]
    pub document_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub lesson_id: LessonId,
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub points: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMcqRequest {
    pub lesson_id: LessonId,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
    #[serde(default)]
    pub points: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NewAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ModuleFilter {
    pub module_id: Option<ModuleId>,
}

#[derive(Debug, Deserialize)]
pub struct LessonFilter {
    pub lesson_id: Option<LessonId>,
}

//
// ─── MODULES & LESSONS ─────────────────────────────────────────────────────────
//

async fn list_modules(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Module>>> {
    Ok(Json(state.services.catalog().list_modules(&session).await?))
}

async fn create_module(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<CreateModuleRequest>,
) -> Result<(StatusCode, Json<Module>)> {
    let Json(payload) = payload?;
    let module = state
        .services
        .catalog()
        .create_module(&session, &payload.title, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(module)))
}

async fn delete_module(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<ModuleId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.catalog().delete_module(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_lessons(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    filter: std::result::Result<Query<ModuleFilter>, QueryRejection>,
) -> Result<Json<Vec<Lesson>>> {
    let Query(filter) = filter?;
    let lessons = state
        .services
        .catalog()
        .list_lessons(&session, filter.module_id)
        .await?;
    Ok(Json(lessons))
}

async fn create_lesson(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Lesson>)> {
    let Json(payload) = payload?;
    let lesson = state
        .services
        .catalog()
        .create_lesson(
            &session,
            payload.module_id,
            &payload.title,
            &payload.content,
            payload.document_url,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// Attach, replace or (with `null`) clear a lesson's reference document.
async fn set_lesson_document(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<LessonId>,
    payload: JsonBody<LessonDocumentRequest>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    state
        .services
        .catalog()
        .set_lesson_document(&session, id, payload.document_url.as_deref())
        .await?;
    Ok(Json(
        json!({ "status": "success", "message": "Lesson document updated." }),
    ))
}

async fn delete_lesson(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<LessonId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.catalog().delete_lesson(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

async fn list_questions(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    filter: std::result::Result<Query<LessonFilter>, QueryRejection>,
) -> Result<Json<Vec<QuestionResponse>>> {
    let Query(filter) = filter?;
    let questions = state
        .services
        .catalog()
        .list_questions(&session, filter.lesson_id)
        .await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

async fn create_question(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>)> {
    let Json(payload) = payload?;
    let question = state
        .services
        .catalog()
        .create_question(
            &session,
            payload.lesson_id,
            &payload.prompt,
            &payload.answer,
            payload.points,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(question.into())))
}

async fn delete_question(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<QuestionId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.catalog().delete_question(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_mcqs(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    filter: std::result::Result<Query<LessonFilter>, QueryRejection>,
) -> Result<Json<Vec<McqResponse>>> {
    let Query(filter) = filter?;
    let mcqs = state
        .services
        .catalog()
        .list_mcqs(&session, filter.lesson_id)
        .await?;
    Ok(Json(mcqs.into_iter().map(Into::into).collect()))
}

async fn create_mcq(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<CreateMcqRequest>,
) -> Result<(StatusCode, Json<McqResponse>)> {
    let Json(payload) = payload?;
    let input = McqInput {
        prompt: &payload.prompt,
        options: [
            payload.option_a.as_str(),
            payload.option_b.as_str(),
            payload.option_c.as_str(),
            payload.option_d.as_str(),
        ],
        correct_option: &payload.correct_option,
        points: payload.points,
    };
    let mcq = state
        .services
        .catalog()
        .create_mcq(&session, payload.lesson_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(mcq.into())))
}

async fn delete_mcq(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<McqId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.catalog().delete_mcq(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// Every account with its completed lesson count and completion percent.
async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<UserProgress>>> {
    Ok(Json(state.services.progress().users_progress(&session).await?))
}

async fn add_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<NewAccountRequest>,
) -> Result<(StatusCode, Json<User>)> {
    create_account(state, session, payload, false).await
}

async fn add_admin(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: JsonBody<NewAccountRequest>,
) -> Result<(StatusCode, Json<User>)> {
    create_account(state, session, payload, true).await
}

async fn create_account(
    state: AppState,
    session: SessionContext,
    payload: JsonBody<NewAccountRequest>,
    is_admin: bool,
) -> Result<(StatusCode, Json<User>)> {
    let Json(payload) = payload?;
    let user = state
        .services
        .accounts()
        .add_user(
            &session,
            &payload.name,
            &payload.email,
            &payload.password,
            is_admin,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn set_user_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<UserId>,
    payload: JsonBody<SetPasswordRequest>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    state
        .services
        .accounts()
        .set_password(&session, id, &payload.new_password)
        .await?;
    Ok(Json(
        json!({ "status": "success", "message": "Password updated." }),
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<UserId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.accounts().delete_user(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//
// ─── INBOX ─────────────────────────────────────────────────────────────────────
//

async fn list_messages(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<InboxResponse>> {
    let contacts = state.services.contacts();
    let messages = contacts.inbox(&session).await?;
    let unread = contacts.unread_count(&session).await?;
    Ok(Json(InboxResponse { unread, messages }))
}

async fn toggle_message_read(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<MessageId>,
) -> Result<Json<Value>> {
    let Path(id) = id?;
    let is_read = state.services.contacts().toggle_read(&session, id).await?;
    Ok(Json(json!({ "id": id, "is_read": is_read })))
}

async fn delete_message(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    id: IdPath<MessageId>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.services.contacts().delete(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
