use chrono::{DateTime, Utc};
use pylearn_core::model::{
    ContactMessage, Lesson, LessonId, McqAnswer, McqId, McqOption, MessageId, Module, ModuleId,
    MultipleChoiceQuestion, Progress, Question, QuestionId, ShortAnswer, User, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Maps unique-constraint violations to `Conflict` and foreign-key violations
/// to `NotFound`; everything else is a connection error.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    conn(e)
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn mcq_id_from_i64(v: i64) -> Result<McqId, StorageError> {
    Ok(McqId::new(i64_to_u64("mcq_id", v)?))
}

pub(crate) fn message_id_from_i64(v: i64) -> Result<MessageId, StorageError> {
    Ok(MessageId::new(i64_to_u64("message_id", v)?))
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

fn i64_to_bool(field: &'static str, v: i64) -> Result<bool, StorageError> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StorageError::Serialization(format!("invalid {field}: {v}"))),
    }
}

fn get_bool(row: &SqliteRow, field: &'static str) -> Result<bool, StorageError> {
    i64_to_bool(field, row.try_get(field).map_err(ser)?)
}

fn parse_option(raw: &str) -> Result<McqOption, StorageError> {
    raw.parse::<McqOption>().map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    User::from_persisted(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get("name").map_err(ser)?,
        row.try_get("email").map_err(ser)?,
        row.try_get("password_hash").map_err(ser)?,
        get_bool(row, "is_admin")?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    Ok(Module {
        id: module_id_from_i64(row.try_get("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: lesson_id_from_i64(row.try_get("id").map_err(ser)?)?,
        module_id: module_id_from_i64(row.try_get("module_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        document_url: row.try_get("document_url").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: question_id_from_i64(row.try_get("id").map_err(ser)?)?,
        lesson_id: lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
        points: i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
    })
}

pub(crate) fn map_mcq_row(row: &SqliteRow) -> Result<MultipleChoiceQuestion, StorageError> {
    let correct: String = row.try_get("correct_option").map_err(ser)?;
    Ok(MultipleChoiceQuestion {
        id: mcq_id_from_i64(row.try_get("id").map_err(ser)?)?,
        lesson_id: lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options: [
            row.try_get("option_a").map_err(ser)?,
            row.try_get("option_b").map_err(ser)?,
            row.try_get("option_c").map_err(ser)?,
            row.try_get("option_d").map_err(ser)?,
        ],
        correct_option: parse_option(&correct)?,
        points: i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
    })
}

pub(crate) fn map_short_answer_row(row: &SqliteRow) -> Result<ShortAnswer, StorageError> {
    Ok(ShortAnswer {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

pub(crate) fn map_mcq_answer_row(row: &SqliteRow) -> Result<McqAnswer, StorageError> {
    let choice: String = row.try_get("choice").map_err(ser)?;
    Ok(McqAnswer {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        question_id: mcq_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
        choice: parse_option(&choice)?,
        is_correct: get_bool(row, "is_correct")?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let last_update: DateTime<Utc> = row.try_get("last_update").map_err(ser)?;
    Ok(Progress {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        lesson_id: lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?,
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        completed: get_bool(row, "completed")?,
        last_update,
    })
}

pub(crate) fn map_message_row(row: &SqliteRow) -> Result<ContactMessage, StorageError> {
    Ok(ContactMessage {
        id: message_id_from_i64(row.try_get("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        subject: row.try_get("subject").map_err(ser)?,
        message: row.try_get("message").map_err(ser)?,
        sent_at: row.try_get("sent_at").map_err(ser)?,
        is_read: get_bool(row, "is_read")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_rejected() {
        assert!(user_id_from_i64(-1).is_err());
        assert_eq!(lesson_id_from_i64(7).unwrap(), LessonId::new(7));
    }

    #[test]
    fn only_zero_and_one_are_booleans() {
        assert!(!i64_to_bool("flag", 0).unwrap());
        assert!(i64_to_bool("flag", 1).unwrap());
        assert!(i64_to_bool("flag", 2).is_err());
    }
}
