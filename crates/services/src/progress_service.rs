use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pylearn_core::model::{
    Lesson, LessonId, McqId, McqOption, Module, ModuleId, Progress, QuestionId, User,
};
use serde::Serialize;
use storage::repository::{AnswerLedger, CatalogRepository, ProgressRepository, UserRepository};

use crate::error::ProgressServiceError;
use crate::session::SessionContext;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// A module with the caller's aggregate progress across its lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleOverview {
    #[serde(flatten)]
    pub module: Module,
    pub lesson_count: u32,
    pub completed_lessons: u32,
    pub total_score: u32,
    pub max_score: u32,
}

/// A lesson with the caller's progress row, or zeros if there is none yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonOverview {
    pub id: LessonId,
    pub title: String,
    pub score: u32,
    pub completed: bool,
    pub max_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDetail {
    pub module: Module,
    pub lessons: Vec<LessonOverview>,
}

/// A short-answer question as shown to learners; the answer stays hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub points: u32,
    pub answered: bool,
}

/// A multiple-choice question as shown to learners; the correct option is
/// only revealed once the caller has picked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McqView {
    pub id: McqId,
    pub prompt: String,
    pub options: BTreeMap<McqOption, String>,
    pub points: u32,
    pub selected: Option<McqOption>,
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonDetail {
    pub lesson: Lesson,
    pub questions: Vec<QuestionView>,
    pub mcqs: Vec<McqView>,
    pub score: u32,
    pub completed: bool,
    pub max_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonProgressView {
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub module_title: String,
    pub score: u32,
    pub max_score: u32,
    pub completed: bool,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub completed_lessons: u32,
    pub total_score: u32,
    pub lessons: Vec<LessonProgressView>,
}

/// One row of the admin user table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    pub user: User,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub percent: f64,
}

/// Completion percentage rounded to one decimal; `0.0` without lessons.
#[must_use]
pub fn completion_percent(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(completed) / f64::from(total) * 1000.0).round() / 10.0
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-side views combining the catalog, the ledger and cached progress.
#[derive(Clone)]
pub struct ProgressService {
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    ledger: Arc<dyn AnswerLedger>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
        ledger: Arc<dyn AnswerLedger>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            users,
            catalog,
            ledger,
            progress,
        }
    }

    async fn progress_by_lesson(
        &self,
        session: &SessionContext,
    ) -> Result<HashMap<LessonId, Progress>, ProgressServiceError> {
        Ok(self
            .progress
            .list_progress(session.user_id)
            .await?
            .into_iter()
            .map(|p| (p.lesson_id, p))
            .collect())
    }

    fn lesson_overview(
        lesson: &Lesson,
        progress: &HashMap<LessonId, Progress>,
        max_scores: &HashMap<LessonId, u32>,
    ) -> LessonOverview {
        let row = progress.get(&lesson.id);
        LessonOverview {
            id: lesson.id,
            title: lesson.title.clone(),
            score: row.map_or(0, |p| p.score),
            completed: row.is_some_and(|p| p.completed),
            max_score: max_scores.get(&lesson.id).copied().unwrap_or(0),
        }
    }

    /// Every module with the caller's summed score against the summed maximum.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on backend failure.
    pub async fn module_overviews(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ModuleOverview>, ProgressServiceError> {
        let modules = self.catalog.list_modules().await?;
        let lessons = self.catalog.list_lessons(None).await?;
        let progress = self.progress_by_lesson(session).await?;
        let max_scores = self.progress.lesson_max_scores().await?;

        Ok(modules
            .into_iter()
            .map(|module| {
                let mut overview = ModuleOverview {
                    module,
                    lesson_count: 0,
                    completed_lessons: 0,
                    total_score: 0,
                    max_score: 0,
                };
                for lesson in lessons.iter().filter(|l| l.module_id == overview.module.id) {
                    let row = Self::lesson_overview(lesson, &progress, &max_scores);
                    overview.lesson_count += 1;
                    overview.completed_lessons += u32::from(row.completed);
                    overview.total_score = overview.total_score.saturating_add(row.score);
                    overview.max_score = overview.max_score.saturating_add(row.max_score);
                }
                overview
            })
            .collect())
    }

    /// Lessons of one module with the caller's progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` for an unknown module.
    pub async fn module_detail(
        &self,
        session: &SessionContext,
        module_id: ModuleId,
    ) -> Result<ModuleDetail, ProgressServiceError> {
        let module = self
            .catalog
            .get_module(module_id)
            .await?
            .ok_or(ProgressServiceError::NotFound("module"))?;
        let lessons = self.catalog.list_lessons(Some(module_id)).await?;
        let progress = self.progress_by_lesson(session).await?;
        let max_scores = self.progress.lesson_max_scores().await?;

        Ok(ModuleDetail {
            module,
            lessons: lessons
                .iter()
                .map(|l| Self::lesson_overview(l, &progress, &max_scores))
                .collect(),
        })
    }

    /// Lesson content with its questions, answers hidden, and what the caller
    /// has already answered.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` for an unknown lesson.
    pub async fn lesson_detail(
        &self,
        session: &SessionContext,
        lesson_id: LessonId,
    ) -> Result<LessonDetail, ProgressServiceError> {
        let lesson = self
            .catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(ProgressServiceError::NotFound("lesson"))?;
        let questions = self.catalog.list_questions(Some(lesson_id)).await?;
        let mcqs = self.catalog.list_mcqs(Some(lesson_id)).await?;

        let answered: Vec<QuestionId> = self
            .ledger
            .short_answers(session.user_id, lesson_id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect();
        let chosen: HashMap<McqId, (McqOption, bool)> = self
            .ledger
            .mcq_answers(session.user_id, lesson_id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, (a.choice, a.is_correct)))
            .collect();
        let progress = self.progress.get_progress(session.user_id, lesson_id).await?;

        let max_score = questions
            .iter()
            .map(|q| q.points)
            .chain(mcqs.iter().map(|m| m.points))
            .fold(0u32, u32::saturating_add);

        Ok(LessonDetail {
            questions: questions
                .into_iter()
                .map(|q| QuestionView {
                    answered: answered.contains(&q.id),
                    id: q.id,
                    prompt: q.prompt,
                    points: q.points,
                })
                .collect(),
            mcqs: mcqs
                .into_iter()
                .map(|m| {
                    let pick = chosen.get(&m.id).copied();
                    McqView {
                        id: m.id,
                        options: McqOption::ALL
                            .into_iter()
                            .map(|slot| (slot, m.option(slot).to_owned()))
                            .collect(),
                        prompt: m.prompt,
                        points: m.points,
                        selected: pick.map(|(choice, _)| choice),
                        is_correct: pick.map(|(_, ok)| ok),
                    }
                })
                .collect(),
            score: progress.as_ref().map_or(0, |p| p.score),
            completed: progress.as_ref().is_some_and(|p| p.completed),
            max_score,
            lesson,
        })
    }

    /// The caller's account and every lesson they have progress in.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the account is gone.
    pub async fn profile(
        &self,
        session: &SessionContext,
    ) -> Result<ProfileView, ProgressServiceError> {
        let user = self
            .users
            .get_user(session.user_id)
            .await?
            .ok_or(ProgressServiceError::NotFound("user"))?;
        let rows = self.progress.list_progress(session.user_id).await?;
        let lessons: HashMap<LessonId, Lesson> = self
            .catalog
            .list_lessons(None)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let modules: HashMap<ModuleId, Module> = self
            .catalog
            .list_modules()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let max_scores = self.progress.lesson_max_scores().await?;

        let mut view = ProfileView {
            user,
            completed_lessons: 0,
            total_score: 0,
            lessons: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            let Some(lesson) = lessons.get(&row.lesson_id) else {
                continue;
            };
            view.completed_lessons += u32::from(row.completed);
            view.total_score = view.total_score.saturating_add(row.score);
            view.lessons.push(LessonProgressView {
                lesson_id: row.lesson_id,
                lesson_title: lesson.title.clone(),
                module_title: modules
                    .get(&lesson.module_id)
                    .map(|m| m.title.clone())
                    .unwrap_or_default(),
                score: row.score,
                max_score: max_scores.get(&row.lesson_id).copied().unwrap_or(0),
                completed: row.completed,
                last_update: row.last_update,
            });
        }
        Ok(view)
    }

    /// Admin table of every account with completed lessons and percentage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Forbidden` for non-admin callers.
    pub async fn users_progress(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<UserProgress>, ProgressServiceError> {
        session.require_admin()?;
        let users = self.users.list_users().await?;
        let total_lessons = count(self.catalog.list_lessons(None).await?.len());
        let completed = self.progress.completed_lesson_counts().await?;

        Ok(users
            .into_iter()
            .map(|user| {
                let done = completed.get(&user.id()).copied().unwrap_or(0);
                UserProgress {
                    percent: completion_percent(done, total_lessons),
                    completed_lessons: done,
                    total_lessons,
                    user,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert!((completion_percent(1, 3) - 33.3).abs() < f64::EPSILON);
        assert!((completion_percent(2, 3) - 66.7).abs() < f64::EPSILON);
        assert!((completion_percent(3, 3) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_without_lessons_is_zero() {
        assert!(completion_percent(0, 0).abs() < f64::EPSILON);
    }
}
