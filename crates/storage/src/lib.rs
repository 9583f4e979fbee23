//! Persistence for accounts, the course catalog, the answer ledger and the
//! cached progress rows.
//!
//! [`repository`] defines the traits and the [`repository::Storage`]
//! aggregate; [`memory`] and [`sqlite`] are the two backends.

pub mod memory;
pub mod repository;
pub mod sqlite;
