mod answer;
mod catalog;
mod contact;
mod ids;
mod progress;
mod question;
mod user;

pub use answer::{McqAnswer, ShortAnswer};
pub use catalog::{CatalogError, Lesson, Module, NewLesson, NewModule, validate_document_url};
pub use contact::{ContactError, ContactMessage, DEFAULT_SUBJECT, NewContactMessage};
pub use ids::{LessonId, McqId, MessageId, ModuleId, ParseIdError, QuestionId, UserId};
pub use progress::Progress;
pub use question::{
    DEFAULT_POINTS, McqOption, MultipleChoiceQuestion, NewMultipleChoiceQuestion, NewQuestion,
    Question, QuestionError, normalize_answer,
};
pub use user::{NewUser, User, UserError, normalize_email};
