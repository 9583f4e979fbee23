use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pylearn_core::model::{
    ContactMessage, Lesson, LessonId, McqAnswer, McqId, McqOption, MessageId, Module, ModuleId,
    MultipleChoiceQuestion, NewContactMessage, NewLesson, NewModule, NewMultipleChoiceQuestion,
    NewQuestion, NewUser, Progress, Question, QuestionId, ShortAnswer, User, UserId,
};
use thiserror::Error;

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Look up by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Overwrite name, email, password hash and role.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user is missing, or
    /// `StorageError::Conflict` if the email belongs to another account.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// Delete the account together with its answers and progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user is missing.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;

    /// All accounts ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;
}

/// Modules, lessons and both question kinds.
///
/// Deletes cascade down the ownership tree, including ledger and progress
/// rows hanging off the deleted content.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError>;
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;
    async fn list_modules(&self) -> Result<Vec<Module>, StorageError>;
    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning module is missing.
    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson, StorageError>;
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;
    /// Lessons ordered by module then id; `None` lists every lesson.
    async fn list_lessons(&self, module: Option<ModuleId>) -> Result<Vec<Lesson>, StorageError>;
    async fn set_lesson_document(
        &self,
        id: LessonId,
        document_url: Option<String>,
    ) -> Result<(), StorageError>;
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning lesson is missing.
    async fn insert_question(&self, question: NewQuestion) -> Result<Question, StorageError>;
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;
    /// Questions ordered by id; `None` lists every question.
    async fn list_questions(&self, lesson: Option<LessonId>)
    -> Result<Vec<Question>, StorageError>;
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning lesson is missing.
    async fn insert_mcq(
        &self,
        mcq: NewMultipleChoiceQuestion,
    ) -> Result<MultipleChoiceQuestion, StorageError>;
    async fn get_mcq(&self, id: McqId) -> Result<Option<MultipleChoiceQuestion>, StorageError>;
    async fn list_mcqs(
        &self,
        lesson: Option<LessonId>,
    ) -> Result<Vec<MultipleChoiceQuestion>, StorageError>;
    async fn delete_mcq(&self, id: McqId) -> Result<(), StorageError>;
}

/// Read side of the answer ledger.
#[async_trait]
pub trait AnswerLedger: Send + Sync {
    /// The user's short-answer rows for questions in `lesson`.
    async fn short_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<ShortAnswer>, StorageError>;

    /// The user's MCQ rows for questions in `lesson`.
    async fn mcq_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<McqAnswer>, StorageError>;
}

/// Ledger writes paired with progress reconciliation.
///
/// Every method runs as one unit: if reconciliation fails the ledger write is
/// rolled back, so the ledger and the cached progress never diverge.
#[async_trait]
pub trait AnswerPersistence: Send + Sync {
    /// Record a correct short answer (no-op if already recorded) and
    /// reconcile the owning lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user or question is missing.
    async fn record_short_answer(
        &self,
        user: UserId,
        question: QuestionId,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError>;

    /// Insert or overwrite the user's MCQ answer and reconcile the owning
    /// lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user or question is missing.
    async fn record_mcq_answer(
        &self,
        user: UserId,
        question: McqId,
        choice: McqOption,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError>;

    /// Recompute and upsert progress for one (user, lesson) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user or lesson is missing.
    async fn reconcile(
        &self,
        user: UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Progress, StorageError>;

    /// Recompute every existing progress row of a lesson, e.g. after its
    /// question set changed. Returns the refreshed rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson is missing.
    async fn reconcile_lesson(
        &self,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Progress>, StorageError>;
}

/// Read side of the cached progress rows plus catalog aggregates used by
/// overview pages.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn get_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<Progress>, StorageError>;

    /// All progress rows of a user, ordered by lesson id.
    async fn list_progress(&self, user: UserId) -> Result<Vec<Progress>, StorageError>;

    /// Maximum attainable score per lesson (sum of question and MCQ points).
    /// Lessons without questions are absent.
    async fn lesson_max_scores(&self) -> Result<HashMap<LessonId, u32>, StorageError>;

    /// Number of completed lessons per user. Users without any are absent.
    async fn completed_lesson_counts(&self) -> Result<HashMap<UserId, u32>, StorageError>;
}

/// Contact-form inbox.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, StorageError>;

    /// Unread first, then newest first.
    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StorageError>;

    async fn unread_count(&self) -> Result<u32, StorageError>;

    /// Flip the read flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the message is missing.
    async fn toggle_read(&self, id: MessageId) -> Result<bool, StorageError>;

    async fn delete_message(&self, id: MessageId) -> Result<(), StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub ledger: Arc<dyn AnswerLedger>,
    pub answers: Arc<dyn AnswerPersistence>,
    pub progress: Arc<dyn ProgressRepository>,
    pub contacts: Arc<dyn ContactRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    pub(crate) fn from_backend<R>(repo: R) -> Self
    where
        R: UserRepository
            + CatalogRepository
            + AnswerLedger
            + AnswerPersistence
            + ProgressRepository
            + ContactRepository
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(repo.clone()),
            catalog: Arc::new(repo.clone()),
            ledger: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            contacts: Arc::new(repo),
        }
    }
}
