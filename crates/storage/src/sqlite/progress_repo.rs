use std::collections::HashMap;

use pylearn_core::model::{LessonId, Progress, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, i64_to_u32, id_i64, lesson_id_from_i64, map_progress_row, ser, user_id_from_i64,
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_id, score, completed, last_update
            FROM progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("lesson_id", lesson.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<Progress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, lesson_id, score, completed, last_update
            FROM progress
            WHERE user_id = ?1
            ORDER BY lesson_id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn lesson_max_scores(&self) -> Result<HashMap<LessonId, u32>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id, SUM(points) AS max_score
            FROM (
                SELECT lesson_id, points FROM questions
                UNION ALL
                SELECT lesson_id, points FROM mcq_questions
            )
            GROUP BY lesson_id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let lesson = lesson_id_from_i64(row.try_get("lesson_id").map_err(ser)?)?;
            let max = i64_to_u32("max_score", row.try_get("max_score").map_err(ser)?)?;
            out.insert(lesson, max);
        }
        Ok(out)
    }

    async fn completed_lesson_counts(&self) -> Result<HashMap<UserId, u32>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, COUNT(*) AS completed
            FROM progress
            WHERE completed = 1
            GROUP BY user_id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let user = user_id_from_i64(row.try_get("user_id").map_err(ser)?)?;
            let count = i64_to_u32("completed", row.try_get("completed").map_err(ser)?)?;
            out.insert(user, count);
        }
        Ok(out)
    }
}
