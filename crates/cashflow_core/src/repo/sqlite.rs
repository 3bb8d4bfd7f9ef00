//! SQLite-backed repository handle.
//!
//! # Responsibility
//! - Own the borrowed, migrated connection shared by the rule, commitment
//!   and series repository implementations.
//! - Map SQLite constraint failures onto semantic repository errors.
//!
//! # Invariants
//! - Construction fails when the schema is not migrated.

use rusqlite::{ffi, Connection, ErrorCode};

use super::{RepoError, RepoResult};

const REQUIRED_TABLES: [&str; 2] = ["recurrence_rules", "commitments"];

/// SQLite repository implementing every storage contract of the core.
pub struct SqliteRepository<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Converts a primary-key violation on insert into `Conflict(id)`.
///
/// Other constraint failures (CHECK, NOT NULL) stay `Db` errors.
pub(crate) fn map_insert_error(err: rusqlite::Error, id: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepoError::Conflict(id.to_string())
        }
        _ => err.into(),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
