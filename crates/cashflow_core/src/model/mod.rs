//! Domain model for rules, commitments and projections.
//!
//! # Responsibility
//! - Define canonical data structures used by the projection engine and
//!   storage adapters.
//! - Own creation defaults, partial-patch semantics and validation.
//!
//! # Invariants
//! - Every persisted record is identified by a stable string id.
//! - Deletion is a hard delete; there is no tombstone state.
//! - Projections are never persisted and carry a derived id.

pub mod commitment;
pub mod projection;
pub mod rule;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use rule::Frequency;

/// Validation failures raised before any write reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be blank")]
    EmptyTitle,
    #[error("amount is required")]
    MissingAmount,
    #[error("interval must be at least 1")]
    ZeroInterval,
    #[error("day_to_send {value} is out of range {min}..={max} for {frequency} rules")]
    DayToSendOutOfRange {
        frequency: Frequency,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("end date {end} is earlier than start date {start}")]
    EndBeforeStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("invalid projection id `{0}`")]
    InvalidProjectionId(String),
    #[error("projection `{0}` is not persisted and cannot be deleted")]
    ProjectionNotPersisted(String),
    #[error("id `{0}` is reserved for projections")]
    ReservedId(String),
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Deserializes a present-but-null patch field as `Some(None)`.
///
/// Combined with `#[serde(default)]`, an absent field stays `None` so the
/// stored value is preserved.
pub(crate) fn patch_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
