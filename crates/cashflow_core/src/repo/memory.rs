//! In-memory document-style backend.
//!
//! # Responsibility
//! - Store whole rule/commitment documents keyed by id.
//! - Provide the same contracts as SQLite so the engine stays
//!   storage-agnostic.
//!
//! # Invariants
//! - Clones share one underlying store.
//! - `insert_series` checks every id before writing any document.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::commitment_repo::{CommitmentListQuery, CommitmentRepository};
use super::rule_repo::RuleRepository;
use super::series_repo::SeriesRepository;
use super::{RepoError, RepoResult};
use crate::model::commitment::{Commitment, CommitmentId, CommitmentPatch};
use crate::model::now_epoch_ms;
use crate::model::rule::{RecurrenceRule, RuleId, RulePatch};

#[derive(Debug, Default)]
struct Documents {
    rules: BTreeMap<RuleId, RecurrenceRule>,
    commitments: BTreeMap<CommitmentId, Commitment>,
}

/// Shared in-memory repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    documents: Arc<Mutex<Documents>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Documents>> {
        self.documents
            .lock()
            .map_err(|_| RepoError::Backend("memory store lock poisoned".to_string()))
    }
}

impl RuleRepository for MemoryRepository {
    fn insert_rule(&self, rule: &RecurrenceRule) -> RepoResult<RuleId> {
        rule.validate()?;
        let mut documents = self.lock()?;
        if documents.rules.contains_key(&rule.id) {
            return Err(RepoError::Conflict(rule.id.clone()));
        }
        documents.rules.insert(rule.id.clone(), rule.clone());
        Ok(rule.id.clone())
    }

    fn update_rule(&self, id: &str, patch: &RulePatch) -> RepoResult<RecurrenceRule> {
        let mut documents = self.lock()?;
        let rule = documents
            .rules
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        rule.apply_patch(patch, now_epoch_ms())?;
        Ok(rule.clone())
    }

    fn get_rule(&self, id: &str) -> RepoResult<Option<RecurrenceRule>> {
        Ok(self.lock()?.rules.get(id).cloned())
    }

    fn list_rules(&self) -> RepoResult<Vec<RecurrenceRule>> {
        let mut rules: Vec<RecurrenceRule> = self.lock()?.rules.values().cloned().collect();
        rules.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rules)
    }

    fn delete_rule(&self, id: &str) -> RepoResult<()> {
        self.lock()?
            .rules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }
}

impl CommitmentRepository for MemoryRepository {
    fn insert_commitment(&self, commitment: &Commitment) -> RepoResult<CommitmentId> {
        let mut documents = self.lock()?;
        ensure_insertable(&documents, commitment)?;
        documents
            .commitments
            .insert(commitment.id.clone(), commitment.clone());
        Ok(commitment.id.clone())
    }

    fn update_commitment(&self, id: &str, patch: &CommitmentPatch) -> RepoResult<Commitment> {
        let mut documents = self.lock()?;
        let commitment = documents
            .commitments
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        commitment.apply_patch(patch, now_epoch_ms());
        Ok(commitment.clone())
    }

    fn get_commitment(&self, id: &str) -> RepoResult<Option<Commitment>> {
        Ok(self.lock()?.commitments.get(id).cloned())
    }

    fn list_commitments(&self, query: &CommitmentListQuery) -> RepoResult<Vec<Commitment>> {
        let mut commitments: Vec<Commitment> = self
            .lock()?
            .commitments
            .values()
            .filter(|commitment| query.matches(commitment.due_date))
            .cloned()
            .collect();
        commitments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(commitments)
    }

    fn delete_commitment(&self, id: &str) -> RepoResult<()> {
        self.lock()?
            .commitments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }
}

impl SeriesRepository for MemoryRepository {
    fn insert_series(&self, rule: &RecurrenceRule, commitments: &[Commitment]) -> RepoResult<()> {
        rule.validate()?;
        let mut documents = self.lock()?;
        if documents.rules.contains_key(&rule.id) {
            return Err(RepoError::Conflict(rule.id.clone()));
        }
        let mut batch_ids = std::collections::HashSet::new();
        for commitment in commitments {
            ensure_insertable(&documents, commitment)?;
            if !batch_ids.insert(commitment.id.as_str()) {
                return Err(RepoError::Conflict(commitment.id.clone()));
            }
        }

        documents.rules.insert(rule.id.clone(), rule.clone());
        for commitment in commitments {
            documents
                .commitments
                .insert(commitment.id.clone(), commitment.clone());
        }
        Ok(())
    }
}

fn ensure_insertable(documents: &Documents, commitment: &Commitment) -> RepoResult<()> {
    if commitment.is_projected {
        return Err(RepoError::InvalidData(format!(
            "projection `{}` cannot be persisted",
            commitment.id
        )));
    }
    if documents.commitments.contains_key(&commitment.id) {
        return Err(RepoError::Conflict(commitment.id.clone()));
    }
    Ok(())
}
