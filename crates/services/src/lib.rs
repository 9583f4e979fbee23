#![forbid(unsafe_code)]

pub mod account_service;
pub mod answer_service;
pub mod app_services;
pub mod catalog_service;
pub mod contact_service;
pub mod error;
pub mod password;
pub mod progress_service;
pub mod session;

pub use pylearn_core::Clock;

pub use account_service::{AccountService, Login};
pub use answer_service::{AnswerService, McqOutcome, ShortAnswerOutcome};
pub use app_services::AppServices;
pub use catalog_service::{CatalogService, McqInput};
pub use contact_service::ContactService;
pub use error::{
    AccountServiceError, AnswerServiceError, AppServicesError, CatalogServiceError,
    ContactServiceError, ProgressServiceError,
};
pub use progress_service::{
    LessonDetail, LessonOverview, LessonProgressView, McqView, ModuleDetail, ModuleOverview,
    ProfileView, ProgressService, QuestionView, UserProgress,
};
pub use session::{AdminRequired, SessionContext, SessionStore};
