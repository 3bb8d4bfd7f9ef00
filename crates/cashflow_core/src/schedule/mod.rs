//! Read-time projection engine.
//!
//! # Responsibility
//! - Expand active rules into ideal due dates (`expander`).
//! - Consume matching real commitments per slot (`reconciler`).
//! - Filter and merge into one deduplicated list (`merge`).
//!
//! # Invariants
//! - Pure and synchronous: output depends only on the snapshot passed in.
//! - Nothing computed here is persisted.
//! - Output is independent of the order of `rules` and `reals`.

pub mod expander;
pub mod merge;
pub mod reconciler;

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use log::debug;

use crate::config::ToleranceConfig;
use crate::model::commitment::Commitment;
use crate::model::rule::RecurrenceRule;

pub use expander::{expand, occurrences, Occurrences};
pub use merge::{discard_near_reals, merge};
pub use reconciler::{reconcile, Reconciliation};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// A range whose `start` is after `end` is valid and contains nothing.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Grows the range by `days` on both sides, saturating at the calendar
    /// bounds.
    pub fn widened(&self, days: u32) -> Self {
        let days = Days::new(u64::from(days));
        Self {
            start: self.start.checked_sub_days(days).unwrap_or(NaiveDate::MIN),
            end: self.end.checked_add_days(days).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Real commitments a read of `range` must load.
///
/// Slots are reconciled over `range` widened by the largest tolerance, and
/// each of those slots may match reals one more tolerance away.
pub fn snapshot_range(range: DateRange, tolerance: &ToleranceConfig) -> DateRange {
    range.widened(tolerance.max_window_days().saturating_mul(2))
}

/// Builds the merged real + projected view for `range`.
///
/// Slots just outside `range` are reconciled too, so a real that belongs to
/// a neighbouring slot is consumed there and never fills an in-range slot.
/// `reals` should cover [`snapshot_range`]; only reals and projections
/// inside `range` are returned.
pub fn project_commitments(
    rules: &[RecurrenceRule],
    reals: &[Commitment],
    range: DateRange,
    tolerance: &ToleranceConfig,
) -> Vec<Commitment> {
    let mut linked: HashMap<&str, Vec<&Commitment>> = HashMap::new();
    for real in reals {
        if let Some(rule_id) = real.recurrence_rule_id.as_deref() {
            linked.entry(rule_id).or_default().push(real);
        }
    }

    let slot_range = range.widened(tolerance.max_window_days());
    let mut projections = Vec::new();
    let mut consumed = 0usize;
    for rule in rules.iter().filter(|rule| rule.is_active) {
        let slots = expand(rule, slot_range);
        if slots.is_empty() {
            continue;
        }
        let candidates = linked
            .get(rule.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let outcome = reconcile(rule, &slots, candidates, tolerance);
        consumed += outcome.consumed.len();
        projections.extend(
            outcome
                .projections
                .into_iter()
                .filter(|projection| range.contains(projection.due_date)),
        );
    }

    let emitted = projections.len();
    let survivors = discard_near_reals(projections, reals, tolerance.dedup_days);
    debug!(
        "event=projection_pass module=schedule rules={} slots_consumed={} projections_emitted={} projections_kept={}",
        rules.len(),
        consumed,
        emitted,
        survivors.len()
    );

    let in_range: Vec<Commitment> = reals
        .iter()
        .filter(|real| range.contains(real.due_date))
        .cloned()
        .collect();
    merge(in_range, survivors)
}

#[cfg(test)]
mod tests {
    use super::{project_commitments, snapshot_range, DateRange};
    use crate::config::ToleranceConfig;
    use crate::model::commitment::{Commitment, NewCommitment};
    use crate::model::rule::{Frequency, NewRecurrenceRule, RecurrenceRule};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly_monday_rule() -> RecurrenceRule {
        let mut input = NewRecurrenceRule::new(
            "Cleaning service",
            Decimal::new(7500, 2),
            Frequency::Weekly,
            date(2025, 1, 6),
        );
        input.id = Some("rule-weekly".to_string());
        input.day_to_send = Some(1);
        input.into_rule(0).unwrap()
    }

    fn monthly_rule(id: &str, day: u32) -> RecurrenceRule {
        let mut input =
            NewRecurrenceRule::new("Rent", Decimal::new(950, 0), Frequency::Monthly, date(2024, 10, day));
        input.id = Some(id.to_string());
        input.into_rule(0).unwrap()
    }

    fn real(id: &str, rule_id: Option<&str>, due: NaiveDate) -> Commitment {
        let mut input = NewCommitment::new("Paid", Decimal::new(7500, 2), due);
        input.id = Some(id.to_string());
        input.recurrence_rule_id = rule_id.map(str::to_string);
        input.into_commitment(0)
    }

    fn january() -> DateRange {
        DateRange::new(date(2025, 1, 1), date(2025, 1, 31))
    }

    #[test]
    fn empty_snapshot_projects_every_slot() {
        let rule = weekly_monday_rule();
        let merged = project_commitments(&[rule.clone()], &[], january(), &ToleranceConfig::default());

        let dates: Vec<NaiveDate> = merged.iter().map(|c| c.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 6), date(2025, 1, 13), date(2025, 1, 20), date(2025, 1, 27)]
        );
        assert!(merged.iter().all(|c| c.is_projected && c.amount == rule.amount));
    }

    #[test]
    fn drifted_real_replaces_its_slot_and_appears_once() {
        let rule = weekly_monday_rule();
        let reals = vec![real("c-14", Some("rule-weekly"), date(2025, 1, 14))];

        let merged = project_commitments(&[rule], &reals, january(), &ToleranceConfig::default());

        let dates: Vec<NaiveDate> = merged.iter().map(|c| c.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 6), date(2025, 1, 14), date(2025, 1, 20), date(2025, 1, 27)]
        );
        assert_eq!(merged.iter().filter(|c| c.id == "c-14").count(), 1);
        assert!(!merged.iter().any(|c| c.due_date == date(2025, 1, 13)));
    }

    #[test]
    fn fully_synced_rule_produces_no_projections() {
        let rule = weekly_monday_rule();
        let reals: Vec<Commitment> = [6, 13, 20, 27]
            .iter()
            .map(|day| real(&format!("c-{day}"), Some("rule-weekly"), date(2025, 1, *day)))
            .collect();

        let merged = project_commitments(&[rule], &reals, january(), &ToleranceConfig::default());

        assert_eq!(merged.len(), 4);
        assert!(merged.iter().all(|c| !c.is_projected));
    }

    #[test]
    fn real_just_outside_range_still_satisfies_in_range_slot() {
        let rule = monthly_rule("rule-rent", 1);
        let reals = vec![real("c-dec", Some("rule-rent"), date(2024, 12, 30))];

        let merged = project_commitments(&[rule], &reals, january(), &ToleranceConfig::default());

        assert!(merged.is_empty());
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let rules = vec![weekly_monday_rule(), monthly_rule("rule-rent", 15)];
        let reals = vec![
            real("c-a", Some("rule-weekly"), date(2025, 1, 8)),
            real("c-b", None, date(2025, 1, 20)),
            real("c-c", Some("rule-rent"), date(2025, 1, 12)),
            real("c-d", Some("rule-weekly"), date(2025, 1, 9)),
        ];
        let tolerance = ToleranceConfig::default();

        let forward = project_commitments(&rules, &reals, january(), &tolerance);

        let mut rules_rev = rules.clone();
        rules_rev.reverse();
        let mut reals_rev = reals.clone();
        reals_rev.reverse();
        let backward = project_commitments(&rules_rev, &reals_rev, january(), &tolerance);

        assert_eq!(forward, backward);
    }

    #[test]
    fn merged_output_has_unique_signatures() {
        let rules = vec![weekly_monday_rule(), monthly_rule("rule-rent", 31)];
        let reals = vec![
            real("c-a", Some("rule-weekly"), date(2025, 1, 7)),
            real("c-b", Some("rule-weekly"), date(2025, 1, 26)),
            real("c-c", Some("rule-rent"), date(2025, 1, 2)),
        ];

        let merged = project_commitments(&rules, &reals, january(), &ToleranceConfig::default());

        let mut seen = HashSet::new();
        for entry in &merged {
            if let Some(signature) = entry.signature() {
                assert!(seen.insert(signature), "duplicate signature {signature:?}");
            }
        }
    }

    #[test]
    fn leftover_real_surfaces_as_independent_entry() {
        let rule = weekly_monday_rule();
        let reals = vec![
            real("c-near", Some("rule-weekly"), date(2025, 1, 6)),
            real("c-extra", Some("rule-weekly"), date(2025, 1, 8)),
        ];
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 7));

        let merged = project_commitments(&[rule], &reals, range, &ToleranceConfig::default());

        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-near"]);

        let wide = DateRange::new(date(2025, 1, 1), date(2025, 1, 10));
        let merged = project_commitments(&[weekly_monday_rule()], &reals, wide, &ToleranceConfig::default());
        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-near", "c-extra"]);
    }

    #[test]
    fn real_consumed_by_neighbouring_slot_does_not_fill_in_range_slot() {
        let reals = vec![real("c-late", Some("rule-weekly"), date(2025, 1, 30))];
        let tolerance = ToleranceConfig::default();

        let january = project_commitments(&[weekly_monday_rule()], &reals, january(), &tolerance);
        let dates: Vec<NaiveDate> = january.iter().map(|c| c.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 6), date(2025, 1, 13), date(2025, 1, 20), date(2025, 1, 30)]
        );

        let early_february = DateRange::new(date(2025, 2, 1), date(2025, 2, 14));
        let february =
            project_commitments(&[weekly_monday_rule()], &reals, early_february, &tolerance);
        let dates: Vec<NaiveDate> = february.iter().map(|c| c.due_date).collect();
        assert_eq!(dates, vec![date(2025, 2, 3), date(2025, 2, 10)]);
        assert!(february.iter().all(|c| c.is_projected));
    }

    #[test]
    fn snapshot_covers_two_tolerance_windows() {
        let snapshot = snapshot_range(january(), &ToleranceConfig::default());
        assert_eq!(snapshot.start, date(2024, 11, 12));
        assert_eq!(snapshot.end, date(2025, 3, 22));
    }
}
