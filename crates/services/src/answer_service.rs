use std::sync::Arc;

use pylearn_core::Clock;
use pylearn_core::model::{McqId, McqOption, Progress, QuestionId};
use storage::repository::{AnswerPersistence, CatalogRepository};

use crate::error::AnswerServiceError;
use crate::session::SessionContext;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of a short-answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortAnswerOutcome {
    /// Recorded (or already on record) and the lesson reconciled.
    Correct { progress: Progress },
    /// Nothing was written.
    Wrong,
}

/// Result of a multiple-choice submission. Both arms carry the reconciled
/// progress because the choice is recorded either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McqOutcome {
    Correct {
        choice: McqOption,
        progress: Progress,
    },
    Wrong {
        choice: McqOption,
        correct_option: McqOption,
        progress: Progress,
    },
}

impl McqOutcome {
    #[must_use]
    pub fn choice(&self) -> McqOption {
        match self {
            McqOutcome::Correct { choice, .. } | McqOutcome::Wrong { choice, .. } => *choice,
        }
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        match self {
            McqOutcome::Correct { progress, .. } | McqOutcome::Wrong { progress, .. } => progress,
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Grades submissions and hands the ledger write plus reconciliation to
/// storage as a single unit.
#[derive(Clone)]
pub struct AnswerService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    answers: Arc<dyn AnswerPersistence>,
}

impl AnswerService {
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

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Grade a short answer. Only a correct answer touches storage.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::QuestionNotFound` for an unknown question,
    /// or `AnswerServiceError::Storage` if the write or reconciliation fails.
    pub async fn submit_short_answer(
        &self,
        session: &SessionContext,
        question_id: QuestionId,
        answer: &str,
    ) -> Result<ShortAnswerOutcome, AnswerServiceError> {
        let question = self
            .catalog
            .get_question(question_id)
            .await?
            .ok_or(AnswerServiceError::QuestionNotFound)?;

        if !question.accepts(answer) {
            tracing::debug!(user = %session.user_id, question = %question_id, "short answer wrong");
            return Ok(ShortAnswerOutcome::Wrong);
        }

        let progress = self
            .answers
            .record_short_answer(session.user_id, question.id, self.clock.now())
            .await?;
        tracing::debug!(
            user = %session.user_id,
            question = %question_id,
            score = progress.score,
            completed = progress.completed,
            "short answer correct"
        );
        Ok(ShortAnswerOutcome::Correct { progress })
    }

    /// Grade a multiple-choice answer. The choice is recorded right or wrong,
    /// replacing any earlier choice for the same question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::Question` if `choice` is not one of
    /// `A`..`D` (checked before anything else),
    /// `AnswerServiceError::QuestionNotFound` for an unknown question, or
    /// `AnswerServiceError::Storage` if the write or reconciliation fails.
    pub async fn submit_mcq_answer(
        &self,
        session: &SessionContext,
        question_id: McqId,
        choice: &str,
    ) -> Result<McqOutcome, AnswerServiceError> {
        let choice: McqOption = choice.parse()?;
        let mcq = self
            .catalog
            .get_mcq(question_id)
            .await?
            .ok_or(AnswerServiceError::QuestionNotFound)?;

        let is_correct = mcq.is_correct(choice);
        let progress = self
            .answers
            .record_mcq_answer(
                session.user_id,
                mcq.id,
                choice,
                is_correct,
                self.clock.now(),
            )
            .await?;
        tracing::debug!(
            user = %session.user_id,
            mcq = %question_id,
            %choice,
            is_correct,
            score = progress.score,
            completed = progress.completed,
            "mcq answer recorded"
        );

        Ok(if is_correct {
            McqOutcome::Correct { choice, progress }
        } else {
            McqOutcome::Wrong {
                choice,
                correct_option: mcq.correct_option,
                progress,
            }
        })
    }
}
