//! Recurrence rule repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `RecurrenceRule::validate()` before SQL mutations.
//! - Read paths reject rows that do not map onto a valid rule.
//! - Deleting a rule leaves commitments that reference it untouched.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::sqlite::{bool_to_int, int_to_bool, map_insert_error, SqliteRepository};
use super::{format_iso_date, parse_iso_date, RepoError, RepoResult};
use crate::model::now_epoch_ms;
use crate::model::rule::{Frequency, RecurrenceRule, RuleId, RulePatch};

const RULE_SELECT_SQL: &str = "SELECT
    id,
    title,
    amount,
    frequency,
    interval_count,
    day_to_send,
    start_date,
    end_date,
    category,
    is_active,
    last_generated_date,
    created_at,
    updated_at
FROM recurrence_rules";

/// Repository interface for recurrence rule CRUD.
pub trait RuleRepository {
    /// Persists a new rule and returns its id.
    fn insert_rule(&self, rule: &RecurrenceRule) -> RepoResult<RuleId>;
    /// Applies a partial patch and returns the stored result.
    fn update_rule(&self, id: &str, patch: &RulePatch) -> RepoResult<RecurrenceRule>;
    fn get_rule(&self, id: &str) -> RepoResult<Option<RecurrenceRule>>;
    /// Lists every rule, active or not, ordered by start date then id.
    fn list_rules(&self) -> RepoResult<Vec<RecurrenceRule>>;
    fn delete_rule(&self, id: &str) -> RepoResult<()>;
}

impl RuleRepository for SqliteRepository<'_> {
    fn insert_rule(&self, rule: &RecurrenceRule) -> RepoResult<RuleId> {
        insert_rule_row(self.conn, rule)?;
        Ok(rule.id.clone())
    }

    fn update_rule(&self, id: &str, patch: &RulePatch) -> RepoResult<RecurrenceRule> {
        let tx = self.conn.unchecked_transaction()?;
        let mut rule = select_rule(&tx, id)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        rule.apply_patch(patch, now_epoch_ms())?;

        tx.execute(
            "UPDATE recurrence_rules
             SET
                title = ?2,
                amount = ?3,
                frequency = ?4,
                interval_count = ?5,
                day_to_send = ?6,
                start_date = ?7,
                end_date = ?8,
                category = ?9,
                is_active = ?10,
                last_generated_date = ?11,
                updated_at = ?12
             WHERE id = ?1;",
            params![
                rule.id.as_str(),
                rule.title.as_str(),
                rule.amount.to_string(),
                rule.frequency.as_str(),
                rule.interval,
                rule.day_to_send,
                format_iso_date(rule.start_date),
                rule.end_date.map(format_iso_date),
                rule.category.as_str(),
                bool_to_int(rule.is_active),
                rule.last_generated_date.map(format_iso_date),
                rule.updated_at,
            ],
        )?;
        tx.commit()?;

        Ok(rule)
    }

    fn get_rule(&self, id: &str) -> RepoResult<Option<RecurrenceRule>> {
        select_rule(self.conn, id)
    }

    fn list_rules(&self) -> RepoResult<Vec<RecurrenceRule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RULE_SELECT_SQL} ORDER BY start_date ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut rules = Vec::new();
        while let Some(row) = rows.next()? {
            rules.push(parse_rule_row(row)?);
        }
        Ok(rules)
    }

    fn delete_rule(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM recurrence_rules WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Inserts one rule row; shared with the series repository transaction.
pub(crate) fn insert_rule_row(conn: &Connection, rule: &RecurrenceRule) -> RepoResult<()> {
    rule.validate()?;

    conn.execute(
        "INSERT INTO recurrence_rules (
            id,
            title,
            amount,
            frequency,
            interval_count,
            day_to_send,
            start_date,
            end_date,
            category,
            is_active,
            last_generated_date,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            rule.id.as_str(),
            rule.title.as_str(),
            rule.amount.to_string(),
            rule.frequency.as_str(),
            rule.interval,
            rule.day_to_send,
            format_iso_date(rule.start_date),
            rule.end_date.map(format_iso_date),
            rule.category.as_str(),
            bool_to_int(rule.is_active),
            rule.last_generated_date.map(format_iso_date),
            rule.created_at,
            rule.updated_at,
        ],
    )
    .map_err(|err| map_insert_error(err, &rule.id))?;

    Ok(())
}

fn select_rule(conn: &Connection, id: &str) -> RepoResult<Option<RecurrenceRule>> {
    let mut stmt = conn.prepare(&format!("{RULE_SELECT_SQL} WHERE id = ?1;"))?;
    let row = stmt
        .query_row([id], |row| Ok(parse_rule_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_rule_row(row: &Row<'_>) -> RepoResult<RecurrenceRule> {
    let amount_text: String = row.get("amount")?;
    let amount = Decimal::from_str(&amount_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid amount `{amount_text}` in recurrence_rules.amount"
        ))
    })?;

    let frequency_text: String = row.get("frequency")?;
    let frequency = Frequency::parse(&frequency_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid frequency `{frequency_text}` in recurrence_rules.frequency"
        ))
    })?;

    let start_text: String = row.get("start_date")?;
    let end_text: Option<String> = row.get("end_date")?;
    let last_generated_text: Option<String> = row.get("last_generated_date")?;

    let rule = RecurrenceRule {
        id: row.get("id")?,
        title: row.get("title")?,
        amount,
        frequency,
        interval: row.get("interval_count")?,
        day_to_send: row.get("day_to_send")?,
        start_date: parse_iso_date(&start_text, "recurrence_rules.start_date")?,
        end_date: end_text
            .map(|text| parse_iso_date(&text, "recurrence_rules.end_date"))
            .transpose()?,
        category: row.get("category")?,
        is_active: int_to_bool(row.get("is_active")?, "recurrence_rules.is_active")?,
        last_generated_date: last_generated_text
            .map(|text| parse_iso_date(&text, "recurrence_rules.last_generated_date"))
            .transpose()?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    rule.validate()
        .map_err(|err| RepoError::InvalidData(format!("rule `{}`: {err}", rule.id)))?;
    Ok(rule)
}
