use chrono::{DateTime, Utc};
use pylearn_core::LessonTally;
use pylearn_core::model::{
    LessonId, McqAnswer, McqId, McqOption, Progress, QuestionId, ShortAnswer, UserId,
};
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};

use super::SqliteRepository;
use super::mapping::{
    bool_to_i64, conn, i64_to_u32, id_i64, lesson_id_from_i64, map_mcq_answer_row,
    map_short_answer_row, ser, user_id_from_i64, write_err,
};
use crate::repository::{AnswerLedger, AnswerPersistence, StorageError};

/// Gather the lesson tally straight from the ledger tables.
///
/// Short-answer rows count by existing; MCQ rows only when `is_correct` is set.
async fn lesson_tally(
    db: &mut SqliteConnection,
    user: i64,
    lesson: i64,
) -> Result<LessonTally, StorageError> {
    let row = sqlx::query(
        r"
        SELECT
            (SELECT COUNT(*) FROM questions WHERE lesson_id = ?2) AS question_count,
            (SELECT COUNT(*) FROM mcq_questions WHERE lesson_id = ?2) AS mcq_count,
            (SELECT COUNT(DISTINCT ua.question_id)
                FROM user_answers ua
                JOIN questions q ON q.id = ua.question_id
                WHERE ua.user_id = ?1 AND q.lesson_id = ?2) AS short_answered,
            (SELECT COALESCE(SUM(q.points), 0)
                FROM user_answers ua
                JOIN questions q ON q.id = ua.question_id
                WHERE ua.user_id = ?1 AND q.lesson_id = ?2) AS short_points,
            (SELECT COUNT(DISTINCT ma.question_id)
                FROM user_mcq_answers ma
                JOIN mcq_questions m ON m.id = ma.question_id
                WHERE ma.user_id = ?1 AND m.lesson_id = ?2 AND ma.is_correct = 1) AS mcq_correct,
            (SELECT COALESCE(SUM(m.points), 0)
                FROM user_mcq_answers ma
                JOIN mcq_questions m ON m.id = ma.question_id
                WHERE ma.user_id = ?1 AND m.lesson_id = ?2 AND ma.is_correct = 1) AS mcq_points
        ",
    )
    .bind(user)
    .bind(lesson)
    .fetch_one(&mut *db)
    .await
    .map_err(conn)?;

    let field = |name: &'static str| -> Result<u32, StorageError> {
        i64_to_u32(name, row.try_get::<i64, _>(name).map_err(ser)?)
    };

    Ok(LessonTally {
        short_points: field("short_points")?,
        mcq_points: field("mcq_points")?,
        question_count: field("question_count")?,
        mcq_count: field("mcq_count")?,
        short_answered: field("short_answered")?,
        mcq_correct: field("mcq_correct")?,
    })
}

/// Recompute and upsert one progress row on the caller's connection.
async fn reconcile_on(
    db: &mut SqliteConnection,
    user: UserId,
    lesson: LessonId,
    now: DateTime<Utc>,
) -> Result<Progress, StorageError> {
    let user_i64 = id_i64("user_id", user.value())?;
    let lesson_i64 = id_i64("lesson_id", lesson.value())?;

    let row = sqlx::query(
        r"
        SELECT
            EXISTS(SELECT 1 FROM users WHERE id = ?1) AS user_exists,
            EXISTS(SELECT 1 FROM lessons WHERE id = ?2) AS lesson_exists
        ",
    )
    .bind(user_i64)
    .bind(lesson_i64)
    .fetch_one(&mut *db)
    .await
    .map_err(conn)?;
    let user_exists: bool = row.try_get("user_exists").map_err(ser)?;
    let lesson_exists: bool = row.try_get("lesson_exists").map_err(ser)?;
    if !user_exists || !lesson_exists {
        return Err(StorageError::NotFound);
    }

    let progress = lesson_tally(db, user_i64, lesson_i64)
        .await?
        .reconcile()
        .into_progress(user, lesson, now);

    sqlx::query(
        r"
        INSERT INTO progress (user_id, lesson_id, score, completed, last_update)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, lesson_id) DO UPDATE SET
            score = excluded.score,
            completed = excluded.completed,
            last_update = excluded.last_update
        ",
    )
    .bind(user_i64)
    .bind(lesson_i64)
    .bind(i64::from(progress.score))
    .bind(bool_to_i64(progress.completed))
    .bind(progress.last_update)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    tracing::debug!(
        user = %user,
        lesson = %lesson,
        score = progress.score,
        completed = progress.completed,
        "progress reconciled"
    );
    Ok(progress)
}

async fn owning_lesson(
    db: &mut SqliteConnection,
    sql: &'static str,
    question: i64,
) -> Result<LessonId, StorageError> {
    let lesson: Option<i64> = sqlx::query_scalar(sql)
        .bind(question)
        .fetch_optional(&mut *db)
        .await
        .map_err(conn)?;
    lesson_id_from_i64(lesson.ok_or(StorageError::NotFound)?)
}

impl SqliteRepository {
    /// Open a transaction that holds the write lock from its first read, so
    /// concurrent writers wait on `busy_timeout` instead of failing busy.
    async fn write_tx(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(conn)
    }
}

#[async_trait::async_trait]
impl AnswerLedger for SqliteRepository {
    async fn short_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<ShortAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT ua.user_id, ua.question_id, ua.answered_at
            FROM user_answers ua
            JOIN questions q ON q.id = ua.question_id
            WHERE ua.user_id = ?1 AND q.lesson_id = ?2
            ORDER BY ua.question_id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("lesson_id", lesson.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_short_answer_row).collect()
    }

    async fn mcq_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<McqAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT ma.user_id, ma.question_id, ma.choice, ma.is_correct, ma.answered_at
            FROM user_mcq_answers ma
            JOIN mcq_questions m ON m.id = ma.question_id
            WHERE ma.user_id = ?1 AND m.lesson_id = ?2
            ORDER BY ma.question_id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("lesson_id", lesson.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_mcq_answer_row).collect()
    }
}

#[async_trait::async_trait]
impl AnswerPersistence for SqliteRepository {
    async fn record_short_answer(
        &self,
        user: UserId,
        question: QuestionId,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut tx = self.write_tx().await?;
        let question_i64 = id_i64("question_id", question.value())?;

        let lesson = owning_lesson(
            &mut tx,
            "SELECT lesson_id FROM questions WHERE id = ?1",
            question_i64,
        )
        .await?;

        sqlx::query(
            r"
            INSERT INTO user_answers (user_id, question_id, answered_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, question_id) DO NOTHING
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(question_i64)
        .bind(answered_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        let progress = reconcile_on(&mut tx, user, lesson, answered_at).await?;
        tx.commit().await.map_err(conn)?;
        Ok(progress)
    }

    async fn record_mcq_answer(
        &self,
        user: UserId,
        question: McqId,
        choice: McqOption,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut tx = self.write_tx().await?;
        let question_i64 = id_i64("mcq_id", question.value())?;

        let lesson = owning_lesson(
            &mut tx,
            "SELECT lesson_id FROM mcq_questions WHERE id = ?1",
            question_i64,
        )
        .await?;

        sqlx::query(
            r"
            INSERT INTO user_mcq_answers (user_id, question_id, choice, is_correct, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, question_id) DO UPDATE SET
                choice = excluded.choice,
                is_correct = excluded.is_correct,
                answered_at = excluded.answered_at
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(question_i64)
        .bind(choice.as_str())
        .bind(bool_to_i64(is_correct))
        .bind(answered_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        let progress = reconcile_on(&mut tx, user, lesson, answered_at).await?;
        tx.commit().await.map_err(conn)?;
        Ok(progress)
    }

    async fn reconcile(
        &self,
        user: UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut tx = self.write_tx().await?;
        let progress = reconcile_on(&mut tx, user, lesson, now).await?;
        tx.commit().await.map_err(conn)?;
        Ok(progress)
    }

    async fn reconcile_lesson(
        &self,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Progress>, StorageError> {
        let mut tx = self.write_tx().await?;
        let lesson_i64 = id_i64("lesson_id", lesson.value())?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lessons WHERE id = ?1)")
            .bind(lesson_i64)
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        if !exists {
            return Err(StorageError::NotFound);
        }

        let users: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM progress WHERE lesson_id = ?1 ORDER BY user_id ASC",
        )
        .bind(lesson_i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;

        let mut refreshed = Vec::with_capacity(users.len());
        for user in users {
            refreshed.push(reconcile_on(&mut tx, user_id_from_i64(user)?, lesson, now).await?);
        }

        tx.commit().await.map_err(conn)?;
        Ok(refreshed)
    }
}
