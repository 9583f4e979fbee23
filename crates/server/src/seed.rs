//! Starter data: an administrator account and a small Python course.
//!
//! Each half runs only when its target is absent (the admin email is not
//! registered, the catalog has no modules), so re-running is a no-op.

use pylearn_core::model::{
    McqOption, NewLesson, NewModule, NewMultipleChoiceQuestion, NewQuestion, NewUser,
    normalize_email,
};
use services::password::{HashError, hash_password};
use storage::repository::{CatalogRepository, Storage, StorageError, UserRepository};
use thiserror::Error;

pub const DEFAULT_ADMIN_NAME: &str = "Admin";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@pylearn.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("invalid seed data: {0}")]
    Invalid(#[from] pylearn_core::Error),
    #[error("could not hash the admin password: {0}")]
    Password(HashError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn invalid(err: impl Into<pylearn_core::Error>) -> SeedError {
    SeedError::Invalid(err.into())
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            admin_name: DEFAULT_ADMIN_NAME.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

/// What a seed run actually inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub modules: u32,
    pub lessons: u32,
    pub questions: u32,
    pub mcqs: u32,
}

struct StarterMcq {
    prompt: &'static str,
    options: [&'static str; 4],
    correct: McqOption,
}

struct StarterLesson {
    title: &'static str,
    content: &'static str,
    question: (&'static str, &'static str, u32),
    mcq: StarterMcq,
}

struct StarterModule {
    title: &'static str,
    description: &'static str,
    lessons: &'static [StarterLesson],
}

const STARTER_COURSE: &[StarterModule] = &[
    StarterModule {
        title: "Python Basics",
        description: "Variables and control flow.",
        lessons: &[
            StarterLesson {
                title: "Variables & Data Types",
                content: "Learn about integers, strings and booleans.",
                question: ("Which keyword prints output?", "print", 10),
                mcq: StarterMcq {
                    prompt: "Which data type holds whole numbers?",
                    options: ["string", "float", "integer", "boolean"],
                    correct: McqOption::C,
                },
            },
            StarterLesson {
                title: "Conditionals (If/Else)",
                content: "Learn how to use if, elif and else.",
                question: ("Which keyword starts a condition?", "if", 15),
                mcq: StarterMcq {
                    prompt: "What runs when an `if` condition is False?",
                    options: ["`pass`", "`then`", "`else`", "`skip`"],
                    correct: McqOption::C,
                },
            },
        ],
    },
    StarterModule {
        title: "Data Analysis",
        description: "An introduction to Pandas and NumPy.",
        lessons: &[],
    },
];

/// Points for each starter MCQ.
const STARTER_MCQ_POINTS: u32 = 10;

/// Seed `storage`; see the module docs for when each half applies.
///
/// # Errors
///
/// Returns `SeedError::Invalid` if the admin options do not validate, or
/// `SeedError::Storage` on backend failure.
pub async fn run(storage: &Storage, options: &SeedOptions) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport {
        admin_created: ensure_admin(storage.users.as_ref(), options).await?,
        ..SeedReport::default()
    };

    if storage.catalog.list_modules().await?.is_empty() {
        seed_course(storage.catalog.as_ref(), &mut report).await?;
    } else {
        tracing::debug!("catalog already populated, skipping starter course");
    }

    tracing::info!(
        admin_created = report.admin_created,
        modules = report.modules,
        lessons = report.lessons,
        questions = report.questions,
        mcqs = report.mcqs,
        "seed finished"
    );
    Ok(report)
}

async fn ensure_admin(users: &dyn UserRepository, options: &SeedOptions) -> Result<bool, SeedError> {
    let email = normalize_email(&options.admin_email);
    if users.find_user_by_email(&email).await?.is_some() {
        return Ok(false);
    }
    if options.admin_password.is_empty() {
        return Err(invalid(pylearn_core::model::UserError::EmptyPasswordHash));
    }
    let admin = NewUser::new(
        &options.admin_name,
        &email,
        hash_password(&options.admin_password).map_err(SeedError::Password)?,
        true,
    )
    .map_err(invalid)?;
    let admin = users.insert_user(admin).await?;
    tracing::info!(user = %admin.id(), "administrator account created");
    Ok(true)
}

async fn seed_course(
    catalog: &dyn CatalogRepository,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    for starter in STARTER_COURSE {
        let module = catalog
            .insert_module(
                NewModule::new(starter.title, Some(starter.description.to_string()))
                    .map_err(invalid)?,
            )
            .await?;
        report.modules += 1;

        for lesson in starter.lessons {
            let stored = catalog
                .insert_lesson(
                    NewLesson::new(module.id, lesson.title, lesson.content, None)
                        .map_err(invalid)?,
                )
                .await?;
            report.lessons += 1;

            let (prompt, answer, points) = lesson.question;
            catalog
                .insert_question(
                    NewQuestion::new(stored.id, prompt, answer, Some(points)).map_err(invalid)?,
                )
                .await?;
            report.questions += 1;

            catalog
                .insert_mcq(
                    NewMultipleChoiceQuestion::new(
                        stored.id,
                        lesson.mcq.prompt,
                        lesson.mcq.options,
                        lesson.mcq.correct,
                        Some(STARTER_MCQ_POINTS),
                    )
                    .map_err(invalid)?,
                )
                .await?;
            report.mcqs += 1;
        }
    }
    Ok(())
}
