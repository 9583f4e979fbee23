use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::{McqId, QuestionId, UserId};
use crate::model::question::McqOption;

/// Ledger row for a short-answer question. Only correct answers are ever
/// recorded, so presence alone means "answered correctly".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortAnswer {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub answered_at: DateTime<Utc>,
}

/// Ledger row for a multiple-choice question. Recorded right or wrong and
/// overwritten when the user answers again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McqAnswer {
    pub user_id: UserId,
    pub question_id: McqId,
    pub choice: McqOption,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}
