use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use pylearn_core::model::{McqId, McqOption, QuestionId};
use serde::{Deserialize, Serialize};
use services::{McqOutcome, SessionContext, ShortAnswerOutcome};

use crate::{
    errors::{ApiError, Result},
    state::AppState,
};

/// Question ids arrive as JSON numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn parse(&self) -> Option<u64> {
        match self {
            RawId::Number(n) => Some(*n),
            RawId::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn question_id(raw: Option<&RawId>) -> Result<u64> {
    raw.and_then(RawId::parse)
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid question id."))
}

#[derive(Debug, Deserialize)]
pub struct CheckAnswerRequest {
    pub question_id: Option<RawId>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitMcqRequest {
    pub question_id: Option<RawId>,
    #[serde(default)]
    pub user_choice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct McqResponse {
    pub status: &'static str,
    pub message: String,
    pub user_choice: McqOption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<McqOption>,
}

/// Grade a short answer. Only a correct answer is recorded.
pub async fn check_answer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: std::result::Result<Json<CheckAnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>> {
    let Json(payload) = payload?;
    let id = QuestionId::new(question_id(payload.question_id.as_ref())?);
    let answer = payload.answer.unwrap_or_default();

    let outcome = state
        .services
        .answers()
        .submit_short_answer(&session, id, &answer)
        .await?;

    let response = match outcome {
        ShortAnswerOutcome::Correct { .. } => AnswerResponse {
            status: "correct",
            message: "Correct answer! Progress updated.".to_string(),
        },
        ShortAnswerOutcome::Wrong => AnswerResponse {
            status: "wrong",
            message: "Wrong answer. Try again!".to_string(),
        },
    };
    Ok(Json(response))
}

/// Grade a multiple-choice answer. The choice is recorded right or wrong and
/// replaces any earlier one.
pub async fn submit_mcq_answer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    payload: std::result::Result<Json<SubmitMcqRequest>, JsonRejection>,
) -> Result<Json<McqResponse>> {
    let Json(payload) = payload?;
    let id = McqId::new(question_id(payload.question_id.as_ref())?);
    let choice = payload.user_choice.unwrap_or_default();

    let outcome = state
        .services
        .answers()
        .submit_mcq_answer(&session, id, &choice)
        .await?;

    let response = match outcome {
        McqOutcome::Correct { choice, .. } => McqResponse {
            status: "correct",
            message: "Correct answer! Progress updated.".to_string(),
            user_choice: choice,
            correct_option: None,
        },
        McqOutcome::Wrong {
            choice,
            correct_option,
            ..
        } => McqResponse {
            status: "wrong",
            message: format!("Wrong answer. The correct answer is {correct_option}."),
            user_choice: choice,
            correct_option: Some(correct_option),
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(question_id(Some(&RawId::Number(3))).unwrap(), 3);
        assert_eq!(question_id(Some(&RawId::Text(" 7 ".into()))).unwrap(), 7);
        assert!(question_id(Some(&RawId::Text("seven".into()))).is_err());
        assert!(question_id(Some(&RawId::Number(0))).is_err());
        assert!(question_id(None).is_err());
    }

    #[test]
    fn correct_option_is_omitted_when_right() {
        let body = serde_json::to_value(McqResponse {
            status: "correct",
            message: String::new(),
            user_choice: McqOption::C,
            correct_option: None,
        })
        .unwrap();
        assert_eq!(body["user_choice"], "C");
        assert!(body.get("correct_option").is_none());
    }
}
