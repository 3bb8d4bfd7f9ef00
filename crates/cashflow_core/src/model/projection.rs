//! Virtual commitments derived from recurrence rules.
//!
//! # Invariants
//! - Projection ids are `projected-{ruleId}-{YYYY-MM-DD}`; they are readable
//!   and cannot collide with generated UUID ids.
//! - Projections are never written to storage.

use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

use super::commitment::{Commitment, CommitmentStatus};
use super::rule::{RecurrenceRule, RuleId};

pub const PROJECTION_ID_PREFIX: &str = "projected-";
pub const PROJECTION_TITLE_SUFFIX: &str = " (Proyectado)";

const ISO_DATE_LEN: usize = 10;

/// Decoded projection id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionId {
    pub rule_id: RuleId,
    pub due_date: NaiveDate,
}

impl ProjectionId {
    pub fn new(rule_id: impl Into<RuleId>, due_date: NaiveDate) -> Self {
        Self {
            rule_id: rule_id.into(),
            due_date,
        }
    }

    /// Returns whether `value` uses the projection id namespace.
    pub fn is_projection_id(value: &str) -> bool {
        value.starts_with(PROJECTION_ID_PREFIX)
    }

    /// Parses `projected-{ruleId}-{YYYY-MM-DD}`.
    ///
    /// The rule id may itself contain `-`; the date is always the trailing
    /// ten characters.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.strip_prefix(PROJECTION_ID_PREFIX)?;
        if rest.len() < ISO_DATE_LEN + 2 || !rest.is_char_boundary(rest.len() - ISO_DATE_LEN) {
            return None;
        }

        let (head, date_text) = rest.split_at(rest.len() - ISO_DATE_LEN);
        let rule_id = head.strip_suffix('-')?;
        if rule_id.is_empty() {
            return None;
        }
        let due_date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").ok()?;
        Some(Self::new(rule_id, due_date))
    }
}

impl Display for ProjectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{PROJECTION_ID_PREFIX}{}-{}",
            self.rule_id,
            self.due_date.format("%Y-%m-%d")
        )
    }
}

/// Builds the virtual commitment for one unmatched schedule slot.
pub fn project(rule: &RecurrenceRule, due_date: NaiveDate) -> Commitment {
    Commitment {
        id: ProjectionId::new(rule.id.as_str(), due_date).to_string(),
        title: format!("{}{PROJECTION_TITLE_SUFFIX}", rule.title),
        amount: rule.amount,
        due_date,
        status: CommitmentStatus::Pending,
        paid_date: None,
        category: rule.category.clone(),
        recurrence_rule_id: Some(rule.id.clone()),
        is_projected: true,
        created_at: rule.updated_at,
        updated_at: rule.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectionId;
    use chrono::NaiveDate;

    #[test]
    fn parses_rule_ids_containing_hyphens() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let id = ProjectionId::new("0b6f6c1e-3d7a-4d0e-9a51-1f2a3b4c5d6e", date);
        let text = id.to_string();

        assert_eq!(
            text,
            "projected-0b6f6c1e-3d7a-4d0e-9a51-1f2a3b4c5d6e-2025-01-13"
        );
        assert_eq!(ProjectionId::parse(&text), Some(id));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(ProjectionId::parse("rule-2025-01-13"), None);
        assert_eq!(ProjectionId::parse("projected--2025-01-13"), None);
        assert_eq!(ProjectionId::parse("projected-rule-2025-13-40"), None);
        assert_eq!(ProjectionId::parse("projected-2025-01-13"), None);
    }
}
