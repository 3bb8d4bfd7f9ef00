//! Commitment domain model.
//!
//! # Responsibility
//! - Define the concrete financial obligation shared by real rows and
//!   read-time projections.
//! - Provide creation defaults and partial-patch semantics.
//!
//! # Invariants
//! - `recurrence_rule_id` is a weak back-reference; the rule may be gone.
//! - `is_projected == false` for every record read from storage.
//! - Every applied patch bumps `updated_at`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rule::{RecurrenceRule, RuleId};
use super::{new_record_id, patch_nullable};

/// Stable identifier for a commitment.
pub type CommitmentId = String;

/// Payment state of a commitment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

impl CommitmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }
}

/// A concrete obligation with a due date, amount and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub id: CommitmentId,
    pub title: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: CommitmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub category: String,
    pub recurrence_rule_id: Option<RuleId>,
    /// `true` only for read-time projections.
    pub is_projected: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Commitment {
    /// Builds a real pending commitment for one scheduled slot of `rule`.
    ///
    /// Used by eager materialization and by projection promotion.
    pub fn materialized(rule: &RecurrenceRule, due_date: NaiveDate, now_ms: i64) -> Self {
        Self {
            id: new_record_id(),
            title: rule.title.clone(),
            amount: rule.amount,
            due_date,
            status: CommitmentStatus::Pending,
            paid_date: None,
            category: rule.category.clone(),
            recurrence_rule_id: Some(rule.id.clone()),
            is_projected: false,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// `(recurrence_rule_id, due_date)` uniqueness key, when linked to a rule.
    pub fn signature(&self) -> Option<(&str, NaiveDate)> {
        self.recurrence_rule_id
            .as_deref()
            .map(|rule_id| (rule_id, self.due_date))
    }

    /// Applies only the supplied patch fields and bumps `updated_at`.
    pub fn apply_patch(&mut self, patch: &CommitmentPatch, now_ms: i64) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(paid_date) = patch.paid_date {
            self.paid_date = paid_date;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(recurrence_rule_id) = &patch.recurrence_rule_id {
            self.recurrence_rule_id = recurrence_rule_id.clone();
        }
        self.updated_at = now_ms;
    }
}

/// Creation input for a real commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommitment {
    /// Caller-provided id; generated when absent.
    pub id: Option<CommitmentId>,
    pub title: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: Option<CommitmentStatus>,
    pub paid_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub recurrence_rule_id: Option<RuleId>,
}

impl NewCommitment {
    pub fn new(title: impl Into<String>, amount: Decimal, due_date: NaiveDate) -> Self {
        Self {
            id: None,
            title: title.into(),
            amount,
            due_date,
            status: None,
            paid_date: None,
            category: None,
            recurrence_rule_id: None,
        }
    }

    /// Resolves defaults: generated id, `pending` status and `now_ms`
    /// timestamps.
    pub fn into_commitment(self, now_ms: i64) -> Commitment {
        Commitment {
            id: self.id.unwrap_or_else(new_record_id),
            title: self.title,
            amount: self.amount,
            due_date: self.due_date,
            status: self.status.unwrap_or_default(),
            paid_date: self.paid_date,
            category: self.category.unwrap_or_default(),
            recurrence_rule_id: self.recurrence_rule_id,
            is_projected: false,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Partial update for a commitment. `None` keeps the stored value.
///
/// `recurrence_rule_id: Some(None)` detaches the commitment from its rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitmentPatch {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<CommitmentStatus>,
    #[serde(deserialize_with = "patch_nullable")]
    pub paid_date: Option<Option<NaiveDate>>,
    pub category: Option<String>,
    #[serde(deserialize_with = "patch_nullable")]
    pub recurrence_rule_id: Option<Option<RuleId>>,
}

impl CommitmentPatch {
    /// Patch that only changes the status.
    pub fn status(status: CommitmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
