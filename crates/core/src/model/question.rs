use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, McqId, QuestionId};

/// Points awarded when a question is created without an explicit value.
pub const DEFAULT_POINTS: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question answer cannot be empty")]
    EmptyAnswer,

    #[error("option {0} cannot be empty")]
    EmptyOption(McqOption),

    #[error("invalid option: {0:?} (expected A, B, C or D)")]
    InvalidOption(String),
}

fn required(raw: &str, err: QuestionError) -> Result<String, QuestionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_owned())
}

//
// ─── SHORT ANSWER ──────────────────────────────────────────────────────────────
//

/// Comparison form for short answers: surrounding whitespace and case are
/// ignored, everything else must match exactly.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub lesson_id: LessonId,
    pub prompt: String,
    pub answer: String,
    pub points: u32,
}

impl NewQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or answer is blank.
    pub fn new(
        lesson_id: LessonId,
        prompt: &str,
        answer: &str,
        points: Option<u32>,
    ) -> Result<Self, QuestionError> {
        Ok(Self {
            lesson_id,
            prompt: required(prompt, QuestionError::EmptyPrompt)?,
            answer: required(answer, QuestionError::EmptyAnswer)?,
            points: points.unwrap_or(DEFAULT_POINTS),
        })
    }

    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            lesson_id: self.lesson_id,
            prompt: self.prompt,
            answer: self.answer,
            points: self.points,
        }
    }
}

/// Short-answer question with a single accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub prompt: String,
    pub answer: String,
    pub points: u32,
}

impl Question {
    /// Whether `submitted` matches the stored answer after normalization.
    #[must_use]
    pub fn accepts(&self, submitted: &str) -> bool {
        normalize_answer(submitted) == normalize_answer(&self.answer)
    }
}

//
// ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────────
//

/// One of the four option slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum McqOption {
    A,
    B,
    C,
    D,
}

impl McqOption {
    pub const ALL: [McqOption; 4] = [McqOption::A, McqOption::B, McqOption::C, McqOption::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            McqOption::A => "A",
            McqOption::B => "B",
            McqOption::C => "C",
            McqOption::D => "D",
        }
    }

    fn index(self) -> usize {
        match self {
            McqOption::A => 0,
            McqOption::B => 1,
            McqOption::C => 2,
            McqOption::D => 3,
        }
    }
}

impl fmt::Display for McqOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McqOption {
    type Err = QuestionError;

    /// Accepts `a`..`d` in any case, with surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(McqOption::A),
            "B" => Ok(McqOption::B),
            "C" => Ok(McqOption::C),
            "D" => Ok(McqOption::D),
            _ => Err(QuestionError::InvalidOption(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMultipleChoiceQuestion {
    pub lesson_id: LessonId,
    pub prompt: String,
    pub options: [String; 4],
    pub correct_option: McqOption,
    pub points: u32,
}

impl NewMultipleChoiceQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or any option is blank.
    pub fn new(
        lesson_id: LessonId,
        prompt: &str,
        options: [&str; 4],
        correct_option: McqOption,
        points: Option<u32>,
    ) -> Result<Self, QuestionError> {
        let prompt = required(prompt, QuestionError::EmptyPrompt)?;
        let mut validated: [String; 4] = Default::default();
        for (slot, raw) in McqOption::ALL.into_iter().zip(options) {
            validated[slot.index()] = required(raw, QuestionError::EmptyOption(slot))?;
        }
        Ok(Self {
            lesson_id,
            prompt,
            options: validated,
            correct_option,
            points: points.unwrap_or(DEFAULT_POINTS),
        })
    }

    #[must_use]
    pub fn assign_id(self, id: McqId) -> MultipleChoiceQuestion {
        MultipleChoiceQuestion {
            id,
            lesson_id: self.lesson_id,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            points: self.points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipleChoiceQuestion {
    pub id: McqId,
    pub lesson_id: LessonId,
    pub prompt: String,
    pub options: [String; 4],
    pub correct_option: McqOption,
    pub points: u32,
}

impl MultipleChoiceQuestion {
    #[must_use]
    pub fn option(&self, slot: McqOption) -> &str {
        &self.options[slot.index()]
    }

    #[must_use]
    pub fn is_correct(&self, choice: McqOption) -> bool {
        choice == self.correct_option
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: &str) -> Question {
        NewQuestion::new(LessonId::new(1), "Keyword to print output?", answer, None)
            .unwrap()
            .assign_id(QuestionId::new(1))
    }

    #[test]
    fn short_answer_ignores_case_and_padding() {
        let q = question("print");
        assert!(q.accepts("  PRINT "));
        assert!(q.accepts("Print"));
        assert!(!q.accepts("printf"));
        assert!(!q.accepts("pr int"));
    }

    #[test]
    fn stored_answer_is_normalized_too() {
        let q = Question {
            answer: "  If ".into(),
            ..question("if")
        };
        assert!(q.accepts("if"));
    }

    #[test]
    fn default_points_apply() {
        assert_eq!(question("x").points, DEFAULT_POINTS);
        let q = NewQuestion::new(LessonId::new(1), "p", "a", Some(15)).unwrap();
        assert_eq!(q.points, 15);
    }

    #[test]
    fn option_parsing_is_case_insensitive() {
        assert_eq!(" c ".parse::<McqOption>().unwrap(), McqOption::C);
        assert_eq!("a".parse::<McqOption>().unwrap(), McqOption::A);
        assert!(matches!(
            "E".parse::<McqOption>(),
            Err(QuestionError::InvalidOption(_))
        ));
        assert!("".parse::<McqOption>().is_err());
        assert!("AB".parse::<McqOption>().is_err());
    }

    #[test]
    fn mcq_requires_every_option() {
        let err = NewMultipleChoiceQuestion::new(
            LessonId::new(1),
            "Which type holds whole numbers?",
            ["string", "float", " ", "boolean"],
            McqOption::C,
            None,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption(McqOption::C));
    }

    #[test]
    fn mcq_grades_against_correct_option() {
        let mcq = NewMultipleChoiceQuestion::new(
            LessonId::new(1),
            "Which type holds whole numbers?",
            ["string", "float", "integer", "boolean"],
            McqOption::C,
            Some(10),
        )
        .unwrap()
        .assign_id(McqId::new(9));
        assert!(mcq.is_correct(McqOption::C));
        assert!(!mcq.is_correct(McqOption::A));
        assert_eq!(mcq.option(McqOption::C), "integer");
    }
}
