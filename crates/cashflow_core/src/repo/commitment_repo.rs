//! Commitment repository contract and SQLite implementation.
//!
//! # Invariants
//! - Only real commitments are stored; projections are rejected on write.
//! - `list_commitments` is ordered by `due_date ASC, id ASC`.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::sqlite::{map_insert_error, SqliteRepository};
use super::{format_iso_date, parse_iso_date, RepoError, RepoResult};
use crate::model::commitment::{Commitment, CommitmentId, CommitmentPatch, CommitmentStatus};
use crate::model::now_epoch_ms;

const COMMITMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    amount,
    due_date,
    status,
    paid_date,
    category,
    recurrence_rule_id,
    created_at,
    updated_at
FROM commitments";

/// Inclusive due-date filter for listing commitments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitmentListQuery {
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
}

impl CommitmentListQuery {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            due_date_from: Some(from),
            due_date_to: Some(to),
        }
    }

    pub fn matches(&self, due_date: NaiveDate) -> bool {
        self.due_date_from.map_or(true, |from| due_date >= from)
            && self.due_date_to.map_or(true, |to| due_date <= to)
    }
}

/// Repository interface for real commitment CRUD.
pub trait CommitmentRepository {
    /// Persists a new real commitment and returns its id.
    fn insert_commitment(&self, commitment: &Commitment) -> RepoResult<CommitmentId>;
    /// Applies a partial patch and returns the stored result.
    fn update_commitment(&self, id: &str, patch: &CommitmentPatch) -> RepoResult<Commitment>;
    fn get_commitment(&self, id: &str) -> RepoResult<Option<Commitment>>;
    fn list_commitments(&self, query: &CommitmentListQuery) -> RepoResult<Vec<Commitment>>;
    fn delete_commitment(&self, id: &str) -> RepoResult<()>;
}

impl CommitmentRepository for SqliteRepository<'_> {
    fn insert_commitment(&self, commitment: &Commitment) -> RepoResult<CommitmentId> {
        insert_commitment_row(self.conn, commitment)?;
        Ok(commitment.id.clone())
    }

    fn update_commitment(&self, id: &str, patch: &CommitmentPatch) -> RepoResult<Commitment> {
        let tx = self.conn.unchecked_transaction()?;
        let mut commitment =
            select_commitment(&tx, id)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        commitment.apply_patch(patch, now_epoch_ms());

        tx.execute(
            "UPDATE commitments
             SET
                title = ?2,
                amount = ?3,
                due_date = ?4,
                status = ?5,
                paid_date = ?6,
                category = ?7,
                recurrence_rule_id = ?8,
                updated_at = ?9
             WHERE id = ?1;",
            params![
                commitment.id.as_str(),
                commitment.title.as_str(),
                commitment.amount.to_string(),
                format_iso_date(commitment.due_date),
                commitment.status.as_str(),
                commitment.paid_date.map(format_iso_date),
                commitment.category.as_str(),
                commitment.recurrence_rule_id.as_deref(),
                commitment.updated_at,
            ],
        )?;
        tx.commit()?;

        Ok(commitment)
    }

    fn get_commitment(&self, id: &str) -> RepoResult<Option<Commitment>> {
        select_commitment(self.conn, id)
    }

    fn list_commitments(&self, query: &CommitmentListQuery) -> RepoResult<Vec<Commitment>> {
        let mut sql = format!("{COMMITMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(from) = query.due_date_from {
            sql.push_str(" AND due_date >= ?");
            bind_values.push(Value::Text(format_iso_date(from)));
        }
        if let Some(to) = query.due_date_to {
            sql.push_str(" AND due_date <= ?");
            bind_values.push(Value::Text(format_iso_date(to)));
        }
        sql.push_str(" ORDER BY due_date ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut commitments = Vec::new();
        while let Some(row) = rows.next()? {
            commitments.push(parse_commitment_row(row)?);
        }
        Ok(commitments)
    }

    fn delete_commitment(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM commitments WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Inserts one commitment row; shared with the series repository transaction.
pub(crate) fn insert_commitment_row(conn: &Connection, commitment: &Commitment) -> RepoResult<()> {
    if commitment.is_projected {
        return Err(RepoError::InvalidData(format!(
            "projection `{}` cannot be persisted",
            commitment.id
        )));
    }

    conn.execute(
        "INSERT INTO commitments (
            id,
            title,
            amount,
            due_date,
            status,
            paid_date,
            category,
            recurrence_rule_id,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            commitment.id.as_str(),
            commitment.title.as_str(),
            commitment.amount.to_string(),
            format_iso_date(commitment.due_date),
            commitment.status.as_str(),
            commitment.paid_date.map(format_iso_date),
            commitment.category.as_str(),
            commitment.recurrence_rule_id.as_deref(),
            commitment.created_at,
            commitment.updated_at,
        ],
    )
    .map_err(|err| map_insert_error(err, &commitment.id))?;

    Ok(())
}

fn select_commitment(conn: &Connection, id: &str) -> RepoResult<Option<Commitment>> {
    let mut stmt = conn.prepare(&format!("{COMMITMENT_SELECT_SQL} WHERE id = ?1;"))?;
    let row = stmt
        .query_row([id], |row| Ok(parse_commitment_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_commitment_row(row: &Row<'_>) -> RepoResult<Commitment> {
    let amount_text: String = row.get("amount")?;
    let amount = Decimal::from_str(&amount_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid amount `{amount_text}` in commitments.amount"))
    })?;

    let status_text: String = row.get("status")?;
    let status = CommitmentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in commitments.status"))
    })?;

    let due_text: String = row.get("due_date")?;
    let paid_text: Option<String> = row.get("paid_date")?;

    Ok(Commitment {
        id: row.get("id")?,
        title: row.get("title")?,
        amount,
        due_date: parse_iso_date(&due_text, "commitments.due_date")?,
        status,
        paid_date: paid_text
            .map(|text| parse_iso_date(&text, "commitments.paid_date"))
            .transpose()?,
        category: row.get("category")?,
        recurrence_rule_id: row.get("recurrence_rule_id")?,
        is_projected: false,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
