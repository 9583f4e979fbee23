use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pylearn_core::LessonTally;
use pylearn_core::model::{
    ContactMessage, Lesson, LessonId, McqAnswer, McqId, McqOption, MessageId, Module, ModuleId,
    MultipleChoiceQuestion, NewContactMessage, NewLesson, NewModule, NewMultipleChoiceQuestion,
    NewQuestion, NewUser, Progress, Question, QuestionId, ShortAnswer, User, UserId,
};

use crate::repository::{
    AnswerLedger, AnswerPersistence, CatalogRepository, ContactRepository, ProgressRepository,
    StorageError, UserRepository,
};

#[derive(Debug, Default)]
struct Sequences {
    users: u64,
    modules: u64,
    lessons: u64,
    questions: u64,
    mcqs: u64,
    messages: u64,
}

fn next(seq: &mut u64) -> u64 {
    *seq += 1;
    *seq
}

/// Every table lives behind one lock so multi-table operations (ledger write
/// plus reconciliation, cascading deletes) are atomic.
#[derive(Debug, Default)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<UserId, User>,
    modules: BTreeMap<ModuleId, Module>,
    lessons: BTreeMap<LessonId, Lesson>,
    questions: BTreeMap<QuestionId, Question>,
    mcqs: BTreeMap<McqId, MultipleChoiceQuestion>,
    short_answers: BTreeMap<(UserId, QuestionId), ShortAnswer>,
    mcq_answers: BTreeMap<(UserId, McqId), McqAnswer>,
    progress: BTreeMap<(UserId, LessonId), Progress>,
    messages: BTreeMap<MessageId, ContactMessage>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email() == email && Some(u.id()) != except)
    }

    fn tally(&self, user: UserId, lesson: LessonId) -> LessonTally {
        let questions: Vec<&Question> = self
            .questions
            .values()
            .filter(|q| q.lesson_id == lesson)
            .collect();
        let mcqs: Vec<&MultipleChoiceQuestion> = self
            .mcqs
            .values()
            .filter(|m| m.lesson_id == lesson)
            .collect();
        let answered: HashSet<QuestionId> = self
            .short_answers
            .keys()
            .filter(|(u, _)| *u == user)
            .map(|(_, q)| *q)
            .collect();
        let mcq_answers: HashMap<McqId, bool> = self
            .mcq_answers
            .values()
            .filter(|a| a.user_id == user)
            .map(|a| (a.question_id, a.is_correct))
            .collect();

        LessonTally::from_ledger(&questions, &mcqs, &answered, &mcq_answers)
    }

    fn reconcile(
        &mut self,
        user: UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        if !self.users.contains_key(&user) || !self.lessons.contains_key(&lesson) {
            return Err(StorageError::NotFound);
        }
        let progress = self.tally(user, lesson).reconcile().into_progress(user, lesson, now);
        self.progress.insert((user, lesson), progress.clone());
        Ok(progress)
    }

    fn remove_question(&mut self, id: QuestionId) {
        self.questions.remove(&id);
        self.short_answers.retain(|(_, q), _| *q != id);
    }

    fn remove_mcq(&mut self, id: McqId) {
        self.mcqs.remove(&id);
        self.mcq_answers.retain(|(_, m), _| *m != id);
    }

    fn remove_lesson(&mut self, id: LessonId) {
        let questions: Vec<QuestionId> = self
            .questions
            .values()
            .filter(|q| q.lesson_id == id)
            .map(|q| q.id)
            .collect();
        for q in questions {
            self.remove_question(q);
        }
        let mcqs: Vec<McqId> = self
            .mcqs
            .values()
            .filter(|m| m.lesson_id == id)
            .map(|m| m.id)
            .collect();
        for m in mcqs {
            self.remove_mcq(m);
        }
        self.progress.retain(|(_, l), _| *l != id);
        self.lessons.remove(&id);
    }
}

/// In-memory repository for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        if guard.email_taken(user.email(), None) {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(next(&mut guard.seq.users));
        let user = user.assign_id(id);
        guard.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.values().find(|u| u.email() == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.users.contains_key(&user.id()) {
            return Err(StorageError::NotFound);
        }
        if guard.email_taken(user.email(), Some(user.id())) {
            return Err(StorageError::Conflict);
        }
        guard.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.users.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.short_answers.retain(|(u, _), _| *u != id);
        guard.mcq_answers.retain(|(u, _), _| *u != id);
        guard.progress.retain(|(u, _), _| *u != id);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError> {
        let mut guard = self.lock()?;
        let id = ModuleId::new(next(&mut guard.seq.modules));
        let module = module.assign_id(id);
        guard.modules.insert(id, module.clone());
        Ok(module)
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        Ok(self.lock()?.modules.get(&id).cloned())
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        Ok(self.lock()?.modules.values().cloned().collect())
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.modules.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        let lessons: Vec<LessonId> = guard
            .lessons
            .values()
            .filter(|l| l.module_id == id)
            .map(|l| l.id)
            .collect();
        for lesson in lessons {
            guard.remove_lesson(lesson);
        }
        Ok(())
    }

    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson, StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&lesson.module_id) {
            return Err(StorageError::NotFound);
        }
        let id = LessonId::new(next(&mut guard.seq.lessons));
        let lesson = lesson.assign_id(id);
        guard.lessons.insert(id, lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn list_lessons(&self, module: Option<ModuleId>) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| module.is_none_or(|m| l.module_id == m))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.module_id, l.id));
        Ok(lessons)
    }

    async fn set_lesson_document(
        &self,
        id: LessonId,
        document_url: Option<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let lesson = guard.lessons.get_mut(&id).ok_or(StorageError::NotFound)?;
        lesson.document_url = document_url;
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_lesson(id);
        Ok(())
    }

    async fn insert_question(&self, question: NewQuestion) -> Result<Question, StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&question.lesson_id) {
            return Err(StorageError::NotFound);
        }
        let id = QuestionId::new(next(&mut guard.seq.questions));
        let question = question.assign_id(id);
        guard.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn list_questions(
        &self,
        lesson: Option<LessonId>,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| lesson.is_none_or(|l| q.lesson_id == l))
            .cloned()
            .collect())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_question(id);
        Ok(())
    }

    async fn insert_mcq(
        &self,
        mcq: NewMultipleChoiceQuestion,
    ) -> Result<MultipleChoiceQuestion, StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&mcq.lesson_id) {
            return Err(StorageError::NotFound);
        }
        let id = McqId::new(next(&mut guard.seq.mcqs));
        let mcq = mcq.assign_id(id);
        guard.mcqs.insert(id, mcq.clone());
        Ok(mcq)
    }

    async fn get_mcq(&self, id: McqId) -> Result<Option<MultipleChoiceQuestion>, StorageError> {
        Ok(self.lock()?.mcqs.get(&id).cloned())
    }

    async fn list_mcqs(
        &self,
        lesson: Option<LessonId>,
    ) -> Result<Vec<MultipleChoiceQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .mcqs
            .values()
            .filter(|m| lesson.is_none_or(|l| m.lesson_id == l))
            .cloned()
            .collect())
    }

    async fn delete_mcq(&self, id: McqId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.mcqs.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_mcq(id);
        Ok(())
    }
}

#[async_trait]
impl AnswerLedger for InMemoryRepository {
    async fn short_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<ShortAnswer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .short_answers
            .values()
            .filter(|a| {
                a.user_id == user
                    && guard
                        .questions
                        .get(&a.question_id)
                        .is_some_and(|q| q.lesson_id == lesson)
            })
            .cloned()
            .collect())
    }

    async fn mcq_answers(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Vec<McqAnswer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .mcq_answers
            .values()
            .filter(|a| {
                a.user_id == user
                    && guard
                        .mcqs
                        .get(&a.question_id)
                        .is_some_and(|m| m.lesson_id == lesson)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnswerPersistence for InMemoryRepository {
    async fn record_short_answer(
        &self,
        user: UserId,
        question: QuestionId,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut guard = self.lock()?;
        let lesson = guard
            .questions
            .get(&question)
            .map(|q| q.lesson_id)
            .ok_or(StorageError::NotFound)?;
        if !guard.users.contains_key(&user) {
            return Err(StorageError::NotFound);
        }

        guard
            .short_answers
            .entry((user, question))
            .or_insert(ShortAnswer {
                user_id: user,
                question_id: question,
                answered_at,
            });

        guard.reconcile(user, lesson, answered_at)
    }

    async fn record_mcq_answer(
        &self,
        user: UserId,
        question: McqId,
        choice: McqOption,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut guard = self.lock()?;
        let lesson = guard
            .mcqs
            .get(&question)
            .map(|m| m.lesson_id)
            .ok_or(StorageError::NotFound)?;
        if !guard.users.contains_key(&user) {
            return Err(StorageError::NotFound);
        }

        guard.mcq_answers.insert(
            (user, question),
            McqAnswer {
                user_id: user,
                question_id: question,
                choice,
                is_correct,
                answered_at,
            },
        );

        guard.reconcile(user, lesson, answered_at)
    }

    async fn reconcile(
        &self,
        user: UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        self.lock()?.reconcile(user, lesson, now)
    }

    async fn reconcile_lesson(
        &self,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Progress>, StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&lesson) {
            return Err(StorageError::NotFound);
        }
        let users: Vec<UserId> = guard
            .progress
            .keys()
            .filter(|(_, l)| *l == lesson)
            .map(|(u, _)| *u)
            .collect();
        let mut refreshed = Vec::with_capacity(users.len());
        for user in users {
            refreshed.push(guard.reconcile(user, lesson, now)?);
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<Progress>, StorageError> {
        Ok(self.lock()?.progress.get(&(user, lesson)).cloned())
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<Progress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<Progress> = guard
            .progress
            .values()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.lesson_id);
        Ok(rows)
    }

    async fn lesson_max_scores(&self) -> Result<HashMap<LessonId, u32>, StorageError> {
        let guard = self.lock()?;
        let mut out: HashMap<LessonId, u32> = HashMap::new();
        for q in guard.questions.values() {
            let entry = out.entry(q.lesson_id).or_default();
            *entry = entry.saturating_add(q.points);
        }
        for m in guard.mcqs.values() {
            let entry = out.entry(m.lesson_id).or_default();
            *entry = entry.saturating_add(m.points);
        }
        Ok(out)
    }

    async fn completed_lesson_counts(&self) -> Result<HashMap<UserId, u32>, StorageError> {
        let guard = self.lock()?;
        let mut out: HashMap<UserId, u32> = HashMap::new();
        for p in guard.progress.values().filter(|p| p.completed) {
            *out.entry(p.user_id).or_default() += 1;
        }
        Ok(out)
    }
}

#[async_trait]
impl ContactRepository for InMemoryRepository {
    async fn insert_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, StorageError> {
        let mut guard = self.lock()?;
        let id = MessageId::new(next(&mut guard.seq.messages));
        let message = message.assign_id(id);
        guard.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StorageError> {
        let guard = self.lock()?;
        let mut messages: Vec<ContactMessage> = guard.messages.values().cloned().collect();
        messages.sort_by(|a, b| {
            a.is_read
                .cmp(&b.is_read)
                .then(b.sent_at.cmp(&a.sent_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(messages)
    }

    async fn unread_count(&self) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let unread = guard.messages.values().filter(|m| !m.is_read).count();
        u32::try_from(unread).map_err(|_| StorageError::Serialization("unread overflow".into()))
    }

    async fn toggle_read(&self, id: MessageId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let message = guard.messages.get_mut(&id).ok_or(StorageError::NotFound)?;
        message.is_read = !message.is_read;
        Ok(message.is_read)
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .messages
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pylearn_core::time::fixed_now;

    async fn seeded() -> (InMemoryRepository, UserId, LessonId, QuestionId, McqId) {
        let repo = InMemoryRepository::new();
        let user = repo
            .insert_user(NewUser::new("Ana", "ana@x.io", "hash", false).unwrap())
            .await
            .unwrap();
        let module = repo
            .insert_module(NewModule::new("Basics", None).unwrap())
            .await
            .unwrap();
        let lesson = repo
            .insert_lesson(NewLesson::new(module.id, "Variables", "", None).unwrap())
            .await
            .unwrap();
        let question = repo
            .insert_question(NewQuestion::new(lesson.id, "print?", "print", Some(10)).unwrap())
            .await
            .unwrap();
        let mcq = repo
            .insert_mcq(
                NewMultipleChoiceQuestion::new(
                    lesson.id,
                    "int?",
                    ["string", "float", "integer", "boolean"],
                    McqOption::C,
                    Some(10),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        (repo, user.id(), lesson.id, question.id, mcq.id)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert_user(NewUser::new("A", "a@x.io", "h", false).unwrap())
            .await
            .unwrap();
        let err = repo
            .insert_user(NewUser::new("B", "A@X.io", "h", false).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn short_answer_is_recorded_once() {
        let (repo, user, lesson, question, _) = seeded().await;
        repo.record_short_answer(user, question, fixed_now())
            .await
            .unwrap();
        let progress = repo
            .record_short_answer(user, question, fixed_now())
            .await
            .unwrap();
        assert_eq!(progress.score, 10);
        assert_eq!(repo.short_answers(user, lesson).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reconcile_without_ledger_changes_is_stable() {
        let (repo, user, lesson, question, mcq) = seeded().await;
        let now = fixed_now();
        repo.record_short_answer(user, question, now).await.unwrap();
        repo.record_mcq_answer(user, mcq, McqOption::B, false, now)
            .await
            .unwrap();

        let first = repo.reconcile(user, lesson, now).await.unwrap();
        let second = repo.reconcile(user, lesson, now).await.unwrap();
        assert_eq!(first, second);
        assert_eq!((second.score, second.completed), (10, false));
        assert_eq!(repo.get_progress(user, lesson).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn unknown_user_leaves_ledger_untouched() {
        let (repo, _, lesson, question, _) = seeded().await;
        let ghost = UserId::new(999);
        let err = repo
            .record_short_answer(ghost, question, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.short_answers(ghost, lesson).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let (repo, user, lesson, question, mcq) = seeded().await;
        repo.record_short_answer(user, question, fixed_now())
            .await
            .unwrap();
        repo.record_mcq_answer(user, mcq, McqOption::A, false, fixed_now())
            .await
            .unwrap();

        repo.delete_user(user).await.unwrap();

        assert!(repo.short_answers(user, lesson).await.unwrap().is_empty());
        assert!(repo.mcq_answers(user, lesson).await.unwrap().is_empty());
        assert!(repo.get_progress(user, lesson).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_lesson_cascades_to_questions_and_progress() {
        let (repo, user, lesson, question, mcq) = seeded().await;
        repo.record_short_answer(user, question, fixed_now())
            .await
            .unwrap();

        repo.delete_lesson(lesson).await.unwrap();

        assert!(repo.get_question(question).await.unwrap().is_none());
        assert!(repo.get_mcq(mcq).await.unwrap().is_none());
        assert!(repo.list_progress(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_list_unread_first_then_newest() {
        let repo = InMemoryRepository::new();
        let t0 = fixed_now();
        for (i, name) in ["old", "mid", "new"].iter().enumerate() {
            let at = t0 + chrono::Duration::minutes(i64::try_from(i).unwrap());
            repo.insert_message(NewContactMessage::new(name, "x@y.z", None, "hi", at).unwrap())
                .await
                .unwrap();
        }
        // mark "new" as read
        assert!(repo.toggle_read(MessageId::new(3)).await.unwrap());

        let names: Vec<String> = repo
            .list_messages()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["mid", "old", "new"]);
        assert_eq!(repo.unread_count().await.unwrap(), 2);
    }
}
