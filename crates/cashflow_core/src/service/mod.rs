//! Core use-case services.
//!
//! # Responsibility
//! - Expose the cash-flow operations callers (CLI, UI bridges) use.
//! - Orchestrate repository snapshots into the projection engine.
//!
//! # Invariants
//! - Services stay storage-agnostic; backends are injected.
//! - Reads never write: projections exist only in returned values.

pub mod cashflow_service;
pub mod recurring_entry;

use thiserror::Error;

use crate::model::ValidationError;
use crate::repo::RepoError;

pub use cashflow_service::CashflowService;
pub use recurring_entry::{plan_series, NewRecurringEntry, RecurringSeries};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error surface of the cash-flow service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Repository failure, propagated unchanged.
    #[error(transparent)]
    Storage(RepoError),
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}
