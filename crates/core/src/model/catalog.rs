use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::model::ids::{LessonId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("module title cannot be empty")]
    EmptyModuleTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("document url cannot be empty")]
    EmptyDocumentUrl,

    #[error("document url must be an http(s) link: {0}")]
    InvalidDocumentUrl(String),
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModule {
    pub title: String,
    pub description: Option<String>,
}

impl NewModule {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyModuleTitle` if the title is blank.
    pub fn new(title: impl AsRef<str>, description: Option<String>) -> Result<Self, CatalogError> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return Err(CatalogError::EmptyModuleTitle);
        }
        Ok(Self {
            title: title.to_owned(),
            description: non_blank(description),
        })
    }

    #[must_use]
    pub fn assign_id(self, id: ModuleId) -> Module {
        Module {
            id,
            title: self.title,
            description: self.description,
        }
    }
}

/// A course category. Owns lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub description: Option<String>,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLesson {
    pub module_id: ModuleId,
    pub title: String,
    pub content: String,
    pub document_url: Option<String>,
}

impl NewLesson {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonTitle` if the title is blank, or
    /// `CatalogError::InvalidDocumentUrl` for a document that is not a link.
    pub fn new(
        module_id: ModuleId,
        title: impl AsRef<str>,
        content: impl Into<String>,
        document_url: Option<String>,
    ) -> Result<Self, CatalogError> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return Err(CatalogError::EmptyLessonTitle);
        }
        Ok(Self {
            module_id,
            title: title.to_owned(),
            content: content.into(),
            document_url: non_blank(document_url)
                .map(|url| validate_document_url(&url))
                .transpose()?,
        })
    }

    #[must_use]
    pub fn assign_id(self, id: LessonId) -> Lesson {
        Lesson {
            id,
            module_id: self.module_id,
            title: self.title,
            content: self.content,
            document_url: self.document_url,
        }
    }
}

/// A unit of study inside a module; owns questions, MCQs and progress rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub content: String,
    pub document_url: Option<String>,
}

/// Trim and validate a document reference before attaching it to a lesson.
///
/// # Errors
///
/// Returns `CatalogError::EmptyDocumentUrl` for a blank reference, or
/// `CatalogError::InvalidDocumentUrl` unless it parses as an http(s) URL.
pub fn validate_document_url(raw: &str) -> Result<String, CatalogError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::EmptyDocumentUrl);
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_owned()),
        _ => Err(CatalogError::InvalidDocumentUrl(trimmed.to_owned())),
    }
}
