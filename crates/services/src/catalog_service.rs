use std::sync::Arc;

use pylearn_core::Clock;
use pylearn_core::model::{
    Lesson, LessonId, McqId, McqOption, Module, ModuleId, MultipleChoiceQuestion, NewLesson,
    NewModule, NewMultipleChoiceQuestion, NewQuestion, Question, QuestionId, validate_document_url,
};
use storage::repository::{AnswerPersistence, CatalogRepository, StorageError};

use crate::error::CatalogServiceError;
use crate::session::SessionContext;

/// Input for a new multiple-choice question, as typed by an administrator.
#[derive(Debug, Clone, Copy)]
pub struct McqInput<'a> {
    pub prompt: &'a str,
    pub options: [&'a str; 4],
    pub correct_option: &'a str,
    pub points: Option<u32>,
}

fn not_found(what: &'static str) -> impl FnOnce(StorageError) -> CatalogServiceError {
    move |err| match err {
        StorageError::NotFound => CatalogServiceError::NotFound(what),
        other => CatalogServiceError::Storage(other),
    }
}

/// Administrator-only content management.
///
/// Changing a lesson's question set re-runs reconciliation for every learner
/// who already has progress in that lesson, so cached scores and completion
/// flags follow the new set.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    answers: Arc<dyn AnswerPersistence>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        answers: Arc<dyn AnswerPersistence>,
    ) -> Self {
        Self {
            clock,
            catalog,
            answers,
        }
    }

    async fn reconcile_lesson(&self, lesson: LessonId) -> Result<(), CatalogServiceError> {
        let refreshed = self
            .answers
            .reconcile_lesson(lesson, self.clock.now())
            .await?;
        tracing::info!(lesson = %lesson, rows = refreshed.len(), "lesson progress refreshed");
        Ok(())
    }

    // ─── MODULES ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError` for non-admins or a blank title.
    pub async fn create_module(
        &self,
        session: &SessionContext,
        title: &str,
        description: Option<String>,
    ) -> Result<Module, CatalogServiceError> {
        session.require_admin()?;
        let module = self
            .catalog
            .insert_module(NewModule::new(title, description)?)
            .await?;
        tracing::info!(module = %module.id, title = %module.title, "module created");
        Ok(module)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admins.
    pub async fn list_modules(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<Module>, CatalogServiceError> {
        session.require_admin()?;
        Ok(self.catalog.list_modules().await?)
    }

    /// Delete a module with all of its lessons.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::NotFound` for an unknown module.
    pub async fn delete_module(
        &self,
        session: &SessionContext,
        id: ModuleId,
    ) -> Result<(), CatalogServiceError> {
        session.require_admin()?;
        self.catalog
            .delete_module(id)
            .await
            .map_err(not_found("module"))?;
        tracing::info!(module = %id, "module deleted");
        Ok(())
    }

    // ─── LESSONS ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError` for non-admins, a blank title or an
    /// unknown module.
    pub async fn create_lesson(
        &self,
        session: &SessionContext,
        module_id: ModuleId,
        title: &str,
        content: &str,
        document_url: Option<String>,
    ) -> Result<Lesson, CatalogServiceError> {
        session.require_admin()?;
        let draft = NewLesson::new(module_id, title, content, document_url)?;
        let lesson = self
            .catalog
            .insert_lesson(draft)
            .await
            .map_err(not_found("module"))?;
        tracing::info!(lesson = %lesson.id, module = %module_id, "lesson created");
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admins.
    pub async fn list_lessons(
        &self,
        session: &SessionContext,
        module: Option<ModuleId>,
    ) -> Result<Vec<Lesson>, CatalogServiceError> {
        session.require_admin()?;
        Ok(self.catalog.list_lessons(module).await?)
    }

    /// Attach a document reference to a lesson, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError` for a blank reference or unknown lesson.
    pub async fn set_lesson_document(
        &self,
        session: &SessionContext,
        id: LessonId,
        document_url: Option<&str>,
    ) -> Result<(), CatalogServiceError> {
        session.require_admin()?;
        let url = document_url.map(validate_document_url).transpose()?;
        self.catalog
            .set_lesson_document(id, url)
            .await
            .map_err(not_found("lesson"))?;
        tracing::info!(lesson = %id, "lesson document updated");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::NotFound` for an unknown lesson.
    pub async fn delete_lesson(
        &self,
        session: &SessionContext,
        id: LessonId,
    ) -> Result<(), CatalogServiceError> {
        session.require_admin()?;
        self.catalog
            .delete_lesson(id)
            .await
            .map_err(not_found("lesson"))?;
        tracing::info!(lesson = %id, "lesson deleted");
        Ok(())
    }

    // ─── QUESTIONS ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError` for non-admins, blank fields or an
    /// unknown lesson.
    pub async fn create_question(
        &self,
        session: &SessionContext,
        lesson_id: LessonId,
        prompt: &str,
        answer: &str,
        points: Option<u32>,
    ) -> Result<Question, CatalogServiceError> {
        session.require_admin()?;
        let draft = NewQuestion::new(lesson_id, prompt, answer, points)?;
        let question = self
            .catalog
            .insert_question(draft)
            .await
            .map_err(not_found("lesson"))?;
        tracing::info!(question = %question.id, lesson = %lesson_id, "question created");
        self.reconcile_lesson(lesson_id).await?;
        Ok(question)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admins.
    pub async fn list_questions(
        &self,
        session: &SessionContext,
        lesson: Option<LessonId>,
    ) -> Result<Vec<Question>, CatalogServiceError> {
        session.require_admin()?;
        Ok(self.catalog.list_questions(lesson).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::NotFound` for an unknown question.
    pub async fn delete_question(
        &self,
        session: &SessionContext,
        id: QuestionId,
    ) -> Result<(), CatalogServiceError> {
        session.require_admin()?;
        let question = self
            .catalog
            .get_question(id)
            .await?
            .ok_or(CatalogServiceError::NotFound("question"))?;
        self.catalog
            .delete_question(id)
            .await
            .map_err(not_found("question"))?;
        tracing::info!(question = %id, lesson = %question.lesson_id, "question deleted");
        self.reconcile_lesson(question.lesson_id).await
    }

    // ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `CatalogServiceError` for non-admins, blank fields, an invalid
    /// correct option or an unknown lesson.
    pub async fn create_mcq(
        &self,
        session: &SessionContext,
        lesson_id: LessonId,
        input: McqInput<'_>,
    ) -> Result<MultipleChoiceQuestion, CatalogServiceError> {
        session.require_admin()?;
        let correct: McqOption = input.correct_option.parse()?;
        let draft = NewMultipleChoiceQuestion::new(
            lesson_id,
            input.prompt,
            input.options,
            correct,
            input.points,
        )?;
        let mcq = self
            .catalog
            .insert_mcq(draft)
            .await
            .map_err(not_found("lesson"))?;
        tracing::info!(mcq = %mcq.id, lesson = %lesson_id, "mcq created");
        self.reconcile_lesson(lesson_id).await?;
        Ok(mcq)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Forbidden` for non-admins.
    pub async fn list_mcqs(
        &self,
        session: &SessionContext,
        lesson: Option<LessonId>,
    ) -> Result<Vec<MultipleChoiceQuestion>, CatalogServiceError> {
        session.require_admin()?;
        Ok(self.catalog.list_mcqs(lesson).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::NotFound` for an unknown MCQ.
    pub async fn delete_mcq(
        &self,
        session: &SessionContext,
        id: McqId,
    ) -> Result<(), CatalogServiceError> {
        session.require_admin()?;
        let mcq = self
            .catalog
            .get_mcq(id)
            .await?
            .ok_or(CatalogServiceError::NotFound("mcq"))?;
        self.catalog
            .delete_mcq(id)
            .await
            .map_err(not_found("mcq"))?;
        tracing::info!(mcq = %id, lesson = %mcq.lesson_id, "mcq deleted");
        self.reconcile_lesson(mcq.lesson_id).await
    }
}
