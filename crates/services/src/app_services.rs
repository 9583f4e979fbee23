use std::sync::Arc;

use chrono::Duration;
use storage::repository::{Storage, StorageError};

use crate::Clock;
use crate::account_service::AccountService;
use crate::answer_service::AnswerService;
use crate::catalog_service::CatalogService;
use crate::contact_service::ContactService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::session::SessionStore;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    answers: Arc<AnswerService>,
    progress: Arc<ProgressService>,
    catalog: Arc<CatalogService>,
    accounts: Arc<AccountService>,
    contacts: Arc<ContactService>,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock, session_ttl: Duration) -> Self {
        let sessions = SessionStore::new(clock, session_ttl);
        let answers = Arc::new(AnswerService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.answers),
        ));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.ledger),
            Arc::clone(&storage.progress),
        ));
        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.answers),
        ));
        let accounts = Arc::new(AccountService::new(Arc::clone(&storage.users), sessions));
        let contacts = Arc::new(ContactService::new(clock, Arc::clone(&storage.contacts)));

        Self {
            storage,
            answers,
            progress,
            catalog,
            accounts,
            contacts,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        max_connections: u32,
        clock: Clock,
        session_ttl: Duration,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, max_connections).await?;
        Ok(Self::new(storage, clock, session_ttl))
    }

    /// Services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock, session_ttl: Duration) -> Self {
        Self::new(Storage::in_memory(), clock, session_ttl)
    }

    /// Cheap round trip to the backend for health checks.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn probe_storage(&self) -> Result<(), StorageError> {
        self.storage.contacts.unread_count().await.map(|_| ())
    }

    #[must_use]
    pub fn answers(&self) -> Arc<AnswerService> {
        Arc::clone(&self.answers)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn contacts(&self) -> Arc<ContactService> {
        Arc::clone(&self.contacts)
    }
}
