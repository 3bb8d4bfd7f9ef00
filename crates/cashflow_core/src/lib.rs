//! Core domain logic for the cash-flow commitment engine.
//! This crate is the single source of truth for projection and
//! reconciliation invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, EngineConfig, LoggingConfig, MaterializationConfig, ToleranceConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::commitment::{
    Commitment, CommitmentId, CommitmentPatch, CommitmentStatus, NewCommitment,
};
pub use model::projection::ProjectionId;
pub use model::rule::{Frequency, NewRecurrenceRule, RecurrenceRule, RuleId, RulePatch};
pub use model::ValidationError;
pub use repo::{
    CashflowStore, CommitmentListQuery, CommitmentRepository, MemoryRepository, RepoError,
    RepoResult, RuleRepository, SeriesRepository, SqliteRepository,
};
pub use schedule::{project_commitments, snapshot_range, DateRange};
pub use service::{
    plan_series, CashflowService, NewRecurringEntry, RecurringSeries, ServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
