use pylearn_core::model::{
    Lesson, LessonId, McqId, Module, ModuleId, MultipleChoiceQuestion, NewLesson,
    NewModule, NewMultipleChoiceQuestion, NewQuestion, Question, QuestionId,
};

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, lesson_id_from_i64, map_lesson_row, map_mcq_row, map_module_row,
    map_question_row, mcq_id_from_i64, module_id_from_i64, question_id_from_i64, write_err,
};
use crate::repository::{CatalogRepository, StorageError};

async fn delete_by_id(
    repo: &SqliteRepository,
    sql: &'static str,
    id: i64,
) -> Result<(), StorageError> {
    let res = sqlx::query(sql)
        .bind(id)
        .execute(&repo.pool)
        .await
        .map_err(conn)?;
    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    // ─── MODULES ───────────────────────────────────────────────────────────────

    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError> {
        let res = sqlx::query("INSERT INTO modules (title, description) VALUES (?1, ?2)")
            .bind(&module.title)
            .bind(&module.description)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(module.assign_id(module_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query("SELECT id, title, description FROM modules WHERE id = ?1")
            .bind(id_i64("module_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query("SELECT id, title, description FROM modules ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        delete_by_id(
            self,
            "DELETE FROM modules WHERE id = ?1",
            id_i64("module_id", id.value())?,
        )
        .await
    }

    // ─── LESSONS ───────────────────────────────────────────────────────────────

    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lessons (module_id, title, content, document_url)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_i64("module_id", lesson.module_id.value())?)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.document_url)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(lesson.assign_id(lesson_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, content, document_url
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn list_lessons(&self, module: Option<ModuleId>) -> Result<Vec<Lesson>, StorageError> {
        let module = module
            .map(|m| id_i64("module_id", m.value()))
            .transpose()?;

        let rows = sqlx::query(
            r"
            SELECT id, module_id, title, content, document_url
            FROM lessons
            WHERE ?1 IS NULL OR module_id = ?1
            ORDER BY module_id ASC, id ASC
            ",
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn set_lesson_document(
        &self,
        id: LessonId,
        document_url: Option<String>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE lessons SET document_url = ?2 WHERE id = ?1")
            .bind(id_i64("lesson_id", id.value())?)
            .bind(document_url)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        delete_by_id(
            self,
            "DELETE FROM lessons WHERE id = ?1",
            id_i64("lesson_id", id.value())?,
        )
        .await
    }

    // ─── SHORT-ANSWER QUESTIONS ────────────────────────────────────────────────

    async fn insert_question(&self, question: NewQuestion) -> Result<Question, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO questions (lesson_id, prompt, answer, points)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_i64("lesson_id", question.lesson_id.value())?)
        .bind(&question.prompt)
        .bind(&question.answer)
        .bind(i64::from(question.points))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(question.assign_id(question_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            "SELECT id, lesson_id, prompt, answer, points FROM questions WHERE id = ?1",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn list_questions(
        &self,
        lesson: Option<LessonId>,
    ) -> Result<Vec<Question>, StorageError> {
        let lesson = lesson
            .map(|l| id_i64("lesson_id", l.value()))
            .transpose()?;

        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, prompt, answer, points
            FROM questions
            WHERE ?1 IS NULL OR lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        delete_by_id(
            self,
            "DELETE FROM questions WHERE id = ?1",
            id_i64("question_id", id.value())?,
        )
        .await
    }

    // ─── MULTIPLE-CHOICE QUESTIONS ─────────────────────────────────────────────

    async fn insert_mcq(
        &self,
        mcq: NewMultipleChoiceQuestion,
    ) -> Result<MultipleChoiceQuestion, StorageError> {
        let [a, b, c, d] = &mcq.options;
        let res = sqlx::query(
            r"
            INSERT INTO mcq_questions (
                lesson_id, prompt, option_a, option_b, option_c, option_d,
                correct_option, points
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("lesson_id", mcq.lesson_id.value())?)
        .bind(&mcq.prompt)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(mcq.correct_option.as_str())
        .bind(i64::from(mcq.points))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(mcq.assign_id(mcq_id_from_i64(res.last_insert_rowid())?))
    }

    async fn get_mcq(&self, id: McqId) -> Result<Option<MultipleChoiceQuestion>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, lesson_id, prompt, option_a, option_b, option_c, option_d,
                   correct_option, points
            FROM mcq_questions WHERE id = ?1
            ",
        )
        .bind(id_i64("mcq_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_mcq_row).transpose()
    }

    async fn list_mcqs(
        &self,
        lesson: Option<LessonId>,
    ) -> Result<Vec<MultipleChoiceQuestion>, StorageError> {
        let lesson = lesson
            .map(|l| id_i64("lesson_id", l.value()))
            .transpose()?;

        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, prompt, option_a, option_b, option_c, option_d,
                   correct_option, points
            FROM mcq_questions
            WHERE ?1 IS NULL OR lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_mcq_row).collect()
    }

    async fn delete_mcq(&self, id: McqId) -> Result<(), StorageError> {
        delete_by_id(
            self,
            "DELETE FROM mcq_questions WHERE id = ?1",
            id_i64("mcq_id", id.value())?,
        )
        .await
    }
}

