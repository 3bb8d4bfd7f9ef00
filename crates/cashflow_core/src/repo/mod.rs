//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow storage contracts the projection engine needs.
//! - Isolate SQLite (and in-memory document) details from services.
//!
//! # Invariants
//! - Updates are partial patches applied to the stored record; omitted
//!   fields are preserved and `updated_at` is bumped.
//! - Deletes are hard deletes and never cascade from rules to commitments.
//! - `SeriesRepository::insert_series` commits every row or none.

pub mod commitment_repo;
pub mod memory;
pub mod rule_repo;
pub mod series_repo;
pub mod sqlite;

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;
use crate::model::ValidationError;

pub use commitment_repo::{CommitmentListQuery, CommitmentRepository};
pub use memory::MemoryRepository;
pub use rule_repo::RuleRepository;
pub use series_repo::SeriesRepository;
pub use sqlite::SqliteRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-level error shared by every repository backend.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Everything the cash-flow service needs from one backend.
pub trait CashflowStore: RuleRepository + CommitmentRepository + SeriesRepository {}

impl<T> CashflowStore for T where T: RuleRepository + CommitmentRepository + SeriesRepository {}

pub(crate) fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_iso_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}
