//! Atomic write of one rule together with its materialized commitments.
//!
//! # Invariants
//! - Either the rule and every commitment are persisted, or nothing is.
//! - No orphan rule without commitments and no commitment pointing at a
//!   rule that was never written.

use log::{error, info};

use super::commitment_repo::insert_commitment_row;
use super::rule_repo::insert_rule_row;
use super::sqlite::SqliteRepository;
use super::RepoResult;
use crate::model::commitment::Commitment;
use crate::model::rule::RecurrenceRule;

/// Repository interface for multi-row recurring-entry writes.
pub trait SeriesRepository {
    /// Persists `rule` and `commitments` as one unit.
    fn insert_series(&self, rule: &RecurrenceRule, commitments: &[Commitment]) -> RepoResult<()>;
}

impl SeriesRepository for SqliteRepository<'_> {
    fn insert_series(&self, rule: &RecurrenceRule, commitments: &[Commitment]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let written = insert_rule_row(&tx, rule).and_then(|()| {
            commitments
                .iter()
                .try_for_each(|commitment| insert_commitment_row(&tx, commitment))
        });
        if let Err(err) = written {
            // Dropping `tx` rolls back every row written so far.
            error!(
                "event=series_insert module=repo status=rollback rule_id={} rows={} error={}",
                rule.id,
                commitments.len() + 1,
                err
            );
            return Err(err);
        }

        tx.commit()?;
        info!(
            "event=series_insert module=repo status=ok rule_id={} commitments={}",
            rule.id,
            commitments.len()
        );
        Ok(())
    }
}
