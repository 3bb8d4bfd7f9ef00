//! Safety-net filter and final merge of real and projected commitments.
//!
//! # Invariants
//! - Real commitments are the source of truth and are always kept.
//! - A projection never shares a `(recurrence_rule_id, due_date)` signature
//!   with any other entry of the merged output.
//! - Output order is `due_date ASC, id ASC`, independent of input order.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use super::reconciler::day_distance;
use crate::model::commitment::Commitment;

/// Drops projections that sit within `dedup_days` of a real commitment
/// linked to the same rule.
pub fn discard_near_reals(
    projections: Vec<Commitment>,
    reals: &[Commitment],
    dedup_days: u32,
) -> Vec<Commitment> {
    let window = i64::from(dedup_days);
    projections
        .into_iter()
        .filter(|projection| {
            let Some((rule_id, due_date)) = projection.signature() else {
                return true;
            };
            !reals.iter().any(|real| {
                real.recurrence_rule_id.as_deref() == Some(rule_id)
                    && day_distance(real.due_date, due_date) <= window
            })
        })
        .collect()
}

/// Merges reals and surviving projections into one sorted list.
pub fn merge(reals: Vec<Commitment>, projections: Vec<Commitment>) -> Vec<Commitment> {
    let mut by_id: BTreeMap<String, Commitment> = BTreeMap::new();
    let mut taken: HashSet<(String, NaiveDate)> = HashSet::new();

    for real in reals {
        if let Some(rule_id) = real.recurrence_rule_id.clone() {
            taken.insert((rule_id, real.due_date));
        }
        by_id.insert(real.id.clone(), real);
    }

    for projection in projections {
        let Some(rule_id) = projection.recurrence_rule_id.clone() else {
            continue;
        };
        if !taken.insert((rule_id, projection.due_date)) {
            continue;
        }
        by_id.entry(projection.id.clone()).or_insert(projection);
    }

    let mut merged: Vec<Commitment> = by_id.into_values().collect();
    merged.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    merged
}

#[cfg(test)]
mod tests {
    use super::{discard_near_reals, merge};
    use crate::model::commitment::{Commitment, NewCommitment};
    use crate::model::projection::project;
    use crate::model::rule::{Frequency, NewRecurrenceRule, RecurrenceRule};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule() -> RecurrenceRule {
        let mut input =
            NewRecurrenceRule::new("Payroll", Decimal::TEN, Frequency::Weekly, date(2025, 1, 6));
        input.id = Some("rule-a".to_string());
        input.into_rule(0).unwrap()
    }

    fn real(id: &str, rule_id: Option<&str>, due: NaiveDate) -> Commitment {
        let mut input = NewCommitment::new("Payroll", Decimal::TEN, due);
        input.id = Some(id.to_string());
        input.recurrence_rule_id = rule_id.map(str::to_string);
        input.into_commitment(0)
    }

    #[test]
    fn safety_net_drops_projection_close_to_linked_real() {
        let rule = rule();
        let projections = vec![project(&rule, date(2025, 1, 13)), project(&rule, date(2025, 1, 20))];
        let reals = vec![real("c1", Some("rule-a"), date(2025, 1, 16))];

        let kept = discard_near_reals(projections, &reals, 3);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].due_date, date(2025, 1, 20));
    }

    #[test]
    fn safety_net_ignores_unlinked_reals() {
        let rule = rule();
        let projections = vec![project(&rule, date(2025, 1, 13))];
        let reals = vec![real("c1", None, date(2025, 1, 13))];

        assert_eq!(discard_near_reals(projections, &reals, 3).len(), 1);
    }

    #[test]
    fn merge_prefers_real_for_shared_signature_and_sorts() {
        let rule = rule();
        let reals = vec![
            real("c2", None, date(2025, 1, 20)),
            real("c1", Some("rule-a"), date(2025, 1, 13)),
        ];
        let projections = vec![project(&rule, date(2025, 1, 13)), project(&rule, date(2025, 1, 6))];

        let merged = merge(reals, projections);
        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, vec!["projected-rule-a-2025-01-06", "c1", "c2"]);
    }

    #[test]
    fn duplicate_projections_collapse_to_one_entry() {
        let rule = rule();
        let projections = vec![project(&rule, date(2025, 1, 6)), project(&rule, date(2025, 1, 6))];

        let merged = merge(Vec::new(), projections);

        assert_eq!(merged.len(), 1);
    }
}
