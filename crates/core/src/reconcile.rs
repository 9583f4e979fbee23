//! Progress reconciliation arithmetic.
//!
//! Storage adapters gather a [`LessonTally`] from the answer ledger inside the
//! transaction that wrote the answer, then call [`LessonTally::reconcile`] and
//! upsert the result. The two ledgers are counted with different predicates:
//! a short-answer row counts by existing, an MCQ row counts only when its
//! correctness flag is set.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{LessonId, McqId, MultipleChoiceQuestion, Progress, Question, QuestionId, UserId};

/// Everything reconciliation needs to know about one (user, lesson) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LessonTally {
    /// Points of short-answer questions with a ledger row.
    pub short_points: u32,
    /// Points of MCQs whose ledger row is marked correct.
    pub mcq_points: u32,
    /// Short-answer questions in the lesson.
    pub question_count: u32,
    /// MCQs in the lesson.
    pub mcq_count: u32,
    /// Distinct short-answer questions with a ledger row.
    pub short_answered: u32,
    /// Distinct MCQs answered correctly.
    pub mcq_correct: u32,
}

/// Result of reconciling one lesson for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub score: u32,
    pub completed: bool,
}

impl LessonTally {
    /// Build a tally from in-memory catalog and ledger state.
    ///
    /// `questions` and `mcqs` must already be filtered to the lesson.
    /// `answered` holds the user's short-answer ledger; `mcq_answers` maps the
    /// user's MCQ ledger to each row's correctness flag.
    #[must_use]
    pub fn from_ledger(
        questions: &[&Question],
        mcqs: &[&MultipleChoiceQuestion],
        answered: &HashSet<QuestionId>,
        mcq_answers: &HashMap<McqId, bool>,
    ) -> Self {
        let mut tally = Self {
            question_count: count(questions.len()),
            mcq_count: count(mcqs.len()),
            ..Self::default()
        };

        for q in questions.iter().filter(|q| answered.contains(&q.id)) {
            tally.short_points = tally.short_points.saturating_add(q.points);
            tally.short_answered += 1;
        }

        for m in mcqs
            .iter()
            .filter(|m| mcq_answers.get(&m.id).copied().unwrap_or(false))
        {
            tally.mcq_points = tally.mcq_points.saturating_add(m.points);
            tally.mcq_correct += 1;
        }

        tally
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.question_count.saturating_add(self.mcq_count)
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.short_answered.saturating_add(self.mcq_correct)
    }

    /// Score and completion for the tally. A lesson without questions is
    /// never complete.
    #[must_use]
    pub fn reconcile(&self) -> Reconciled {
        let total = self.total_questions();
        Reconciled {
            score: self.short_points.saturating_add(self.mcq_points),
            completed: total > 0 && self.correct_count() >= total,
        }
    }
}

impl Reconciled {
    #[must_use]
    pub fn into_progress(self, user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Progress {
        Progress {
            user_id,
            lesson_id,
            score: self.score,
            completed: self.completed,
            last_update: now,
        }
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{McqOption, NewMultipleChoiceQuestion, NewQuestion};

    fn question(id: u64, points: u32) -> Question {
        NewQuestion::new(LessonId::new(1), "prompt", "answer", Some(points))
            .unwrap()
            .assign_id(QuestionId::new(id))
    }

    fn mcq(id: u64, points: u32) -> MultipleChoiceQuestion {
        NewMultipleChoiceQuestion::new(
            LessonId::new(1),
            "prompt",
            ["a", "b", "c", "d"],
            McqOption::C,
            Some(points),
        )
        .unwrap()
        .assign_id(McqId::new(id))
    }

    #[test]
    fn empty_lesson_is_never_completed() {
        let tally = LessonTally::default();
        assert_eq!(
            tally.reconcile(),
            Reconciled {
                score: 0,
                completed: false
            }
        );
    }

    #[test]
    fn all_correct_completes_with_full_score() {
        let q1 = question(1, 10);
        let q2 = question(2, 15);
        let m1 = mcq(1, 10);
        let answered: HashSet<_> = [q1.id, q2.id].into_iter().collect();
        let mcq_answers: HashMap<_, _> = [(m1.id, true)].into_iter().collect();

        let tally = LessonTally::from_ledger(&[&q1, &q2], &[&m1], &answered, &mcq_answers);
        assert_eq!(tally.total_questions(), 3);
        assert_eq!(tally.correct_count(), 3);
        assert_eq!(
            tally.reconcile(),
            Reconciled {
                score: 35,
                completed: true
            }
        );
    }

    #[test]
    fn wrong_mcq_rows_earn_nothing() {
        let q1 = question(1, 10);
        let m1 = mcq(1, 10);
        let answered: HashSet<_> = [q1.id].into_iter().collect();
        let mcq_answers: HashMap<_, _> = [(m1.id, false)].into_iter().collect();

        let tally = LessonTally::from_ledger(&[&q1], &[&m1], &answered, &mcq_answers);
        assert_eq!(tally.mcq_correct, 0);
        assert_eq!(
            tally.reconcile(),
            Reconciled {
                score: 10,
                completed: false
            }
        );
    }

    #[test]
    fn ledger_rows_outside_the_lesson_are_ignored() {
        let q1 = question(1, 10);
        let answered: HashSet<_> = [QuestionId::new(99)].into_iter().collect();
        let mcq_answers: HashMap<_, _> = [(McqId::new(42), true)].into_iter().collect();

        let tally = LessonTally::from_ledger(&[&q1], &[], &answered, &mcq_answers);
        assert_eq!(tally.reconcile().score, 0);
        assert!(!tally.reconcile().completed);
    }

    #[test]
    fn overlapping_ids_across_kinds_do_not_mix() {
        // Question 1 and MCQ 1 are different questions.
        let q1 = question(1, 10);
        let m1 = mcq(1, 5);
        let answered = HashSet::new();
        let mcq_answers: HashMap<_, _> = [(m1.id, true)].into_iter().collect();

        let tally = LessonTally::from_ledger(&[&q1], &[&m1], &answered, &mcq_answers);
        assert_eq!(tally.short_answered, 0);
        assert_eq!(tally.reconcile().score, 5);
    }

    #[test]
    fn into_progress_stamps_identity_and_time() {
        let now = crate::time::fixed_now();
        let p = Reconciled {
            score: 20,
            completed: true,
        }
        .into_progress(UserId::new(1), LessonId::new(2), now);
        assert_eq!(p.score, 20);
        assert!(p.completed);
        assert_eq!(p.last_update, now);
    }
}
