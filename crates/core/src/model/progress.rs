use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::{LessonId, UserId};

/// Cached per-lesson aggregate for one user.
///
/// Derived from the answer ledger by reconciliation; never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub score: u32,
    pub completed: bool,
    pub last_update: DateTime<Utc>,
}

impl Progress {
    /// Same aggregate, ignoring when it was computed.
    #[must_use]
    pub fn same_totals(&self, other: &Progress) -> bool {
        self.user_id == other.user_id
            && self.lesson_id == other.lesson_id
            && self.score == other.score
            && self.completed == other.completed
    }
}
