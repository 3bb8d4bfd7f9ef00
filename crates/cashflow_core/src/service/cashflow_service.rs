//! Cash-flow use-case service.
//!
//! # Responsibility
//! - Provide CRUD entry points for rules and commitments.
//! - Serve range reads as the merged real + projected view.
//! - Promote a projection into a real commitment when it is edited.
//!
//! # Invariants
//! - Every range read works on a fresh snapshot; nothing is cached.
//! - Repository errors reach the caller unchanged (no retries).

use std::time::Instant;

use chrono::NaiveDate;
use log::{info, warn};

use super::{ServiceError, ServiceResult};
use crate::config::EngineConfig;
use crate::model::commitment::{Commitment, CommitmentId, CommitmentPatch, NewCommitment};
use crate::model::projection::ProjectionId;
use crate::model::rule::{NewRecurrenceRule, RecurrenceRule, RuleId, RulePatch};
use crate::model::{now_epoch_ms, ValidationError};
use crate::repo::{CashflowStore, CommitmentListQuery, RepoError};
use crate::schedule::{project_commitments, snapshot_range, DateRange};

/// Service facade over an injected storage backend.
pub struct CashflowService<S: CashflowStore> {
    pub(super) store: S,
    pub(super) config: EngineConfig,
}

impl<S: CashflowStore> CashflowService<S> {
    /// Creates a service with default tolerances and horizon.
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lists commitments.
    ///
    /// With both bounds the result is the merged real + projected view for
    /// `[start, end]`. Otherwise only stored commitments are returned,
    /// filtered by whichever bound is present.
    pub fn get_commitments(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ServiceResult<Vec<Commitment>> {
        match (start, end) {
            (Some(start), Some(end)) => self.get_projected_commitments(DateRange::new(start, end)),
            (due_date_from, due_date_to) => {
                let query = CommitmentListQuery {
                    due_date_from,
                    due_date_to,
                };
                Ok(self.store.list_commitments(&query)?)
            }
        }
    }

    /// Merged real + projected view for `range`, sorted by due date.
    pub fn get_projected_commitments(&self, range: DateRange) -> ServiceResult<Vec<Commitment>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        let tolerance = &self.config.tolerance;
        let snapshot = snapshot_range(range, tolerance);

        let rules = self.store.list_rules()?;
        let reals = self
            .store
            .list_commitments(&CommitmentListQuery::between(
                snapshot.start,
                snapshot.end,
            ))?;
        let merged = project_commitments(&rules, &reals, range, tolerance);

        let projected = merged.iter().filter(|entry| entry.is_projected).count();
        info!(
            "event=commitments_query module=service status=ok start={} end={} rules={} real={} projected={} duration_ms={}",
            range.start,
            range.end,
            rules.len(),
            merged.len() - projected,
            projected,
            started_at.elapsed().as_millis()
        );
        Ok(merged)
    }

    /// Gets one stored commitment by id. Projection ids never resolve.
    pub fn get_commitment(&self, id: &str) -> ServiceResult<Option<Commitment>> {
        Ok(self.store.get_commitment(id)?)
    }

    /// Creates one real commitment and returns its id.
    ///
    /// Missing id and timestamps are generated.
    pub fn add_commitment(&self, input: NewCommitment) -> ServiceResult<CommitmentId> {
        if let Some(id) = input.id.as_deref() {
            if ProjectionId::is_projection_id(id) {
                return Err(ValidationError::ReservedId(id.to_string()).into());
            }
        }

        let commitment = input.into_commitment(now_epoch_ms());
        let id = self.store.insert_commitment(&commitment)?;
        info!("event=commitment_add module=service status=ok id={id}");
        Ok(id)
    }

    /// Applies a partial patch to a commitment.
    ///
    /// When `id` is a projection id, the projection is promoted: a real
    /// commitment carrying the same rule link is inserted with the patch
    /// applied, and the projection is consumed by it on the next read.
    pub fn update_commitment(&self, id: &str, patch: &CommitmentPatch) -> ServiceResult<Commitment> {
        if ProjectionId::is_projection_id(id) {
            return self.promote_projection(id, patch);
        }

        let updated = self.store.update_commitment(id, patch)?;
        info!("event=commitment_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Hard-deletes a stored commitment.
    pub fn delete_commitment(&self, id: &str) -> ServiceResult<()> {
        if ProjectionId::is_projection_id(id) {
            return Err(ValidationError::ProjectionNotPersisted(id.to_string()).into());
        }

        self.store.delete_commitment(id)?;
        info!("event=commitment_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn get_recurrence_rules(&self) -> ServiceResult<Vec<RecurrenceRule>> {
        Ok(self.store.list_rules()?)
    }

    pub fn get_recurrence_rule(&self, id: &str) -> ServiceResult<Option<RecurrenceRule>> {
        Ok(self.store.get_rule(id)?)
    }

    /// Creates a rule after validating title and amount.
    pub fn add_recurrence_rule(&self, input: NewRecurrenceRule) -> ServiceResult<RuleId> {
        let rule = input.into_rule(now_epoch_ms())?;
        let id = self.store.insert_rule(&rule)?;
        info!(
            "event=rule_add module=service status=ok id={id} frequency={} interval={}",
            rule.frequency, rule.interval
        );
        Ok(id)
    }

    /// Patches a rule. Only future expansion is affected.
    pub fn update_recurrence_rule(&self, id: &str, patch: &RulePatch) -> ServiceResult<RecurrenceRule> {
        let updated = self.store.update_rule(id, patch)?;
        info!("event=rule_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Hard-deletes a rule; its commitments are kept.
    pub fn delete_recurrence_rule(&self, id: &str) -> ServiceResult<()> {
        self.store.delete_rule(id)?;
        info!("event=rule_delete module=service status=ok id={id}");
        Ok(())
    }

    fn promote_projection(&self, id: &str, patch: &CommitmentPatch) -> ServiceResult<Commitment> {
        let projection = ProjectionId::parse(id)
            .ok_or_else(|| ValidationError::InvalidProjectionId(id.to_string()))?;
        let rule = self
            .store
            .get_rule(&projection.rule_id)?
            .ok_or_else(|| {
                warn!(
                    "event=projection_promote module=service status=error error_code=rule_missing rule_id={}",
                    projection.rule_id
                );
                ServiceError::Storage(RepoError::NotFound(projection.rule_id.clone()))
            })?;

        let now_ms = now_epoch_ms();
        let mut commitment = Commitment::materialized(&rule, projection.due_date, now_ms);
        commitment.apply_patch(patch, now_ms);
        self.store.insert_commitment(&commitment)?;

        info!(
            "event=projection_promote module=service status=ok rule_id={} due_date={} id={}",
            rule.id, projection.due_date, commitment.id
        );
        Ok(commitment)
    }
}
