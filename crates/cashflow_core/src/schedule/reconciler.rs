//! Per-slot matching of real commitments against a rule's ideal schedule.
//!
//! # Invariants
//! - A real commitment satisfies at most one slot.
//! - The closest real within the rule's window wins; ties go to the earlier
//!   due date, then the smaller id.
//! - Ambiguity is resolved, never reported as an error.

use chrono::NaiveDate;

use crate::config::ToleranceConfig;
use crate::model::commitment::Commitment;
use crate::model::projection::project;
use crate::model::rule::RecurrenceRule;

/// Outcome of reconciling one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Projections for slots no real commitment satisfied.
    pub projections: Vec<Commitment>,
    /// Ids of real commitments consumed by a slot, in slot order.
    pub consumed: Vec<String>,
}

/// Matches `slots` of `rule` against `linked` real commitments.
///
/// `linked` should hold the snapshot's reals carrying `rule.id`; entries
/// linked to other rules are ignored.
pub fn reconcile(
    rule: &RecurrenceRule,
    slots: &[NaiveDate],
    linked: &[&Commitment],
    tolerance: &ToleranceConfig,
) -> Reconciliation {
    let window = i64::from(tolerance.match_window_days(rule.frequency));
    let candidates: Vec<&Commitment> = linked
        .iter()
        .copied()
        .filter(|real| real.recurrence_rule_id.as_deref() == Some(rule.id.as_str()))
        .collect();
    let mut used = vec![false; candidates.len()];
    let mut outcome = Reconciliation::default();

    for &slot in slots {
        let nearest = candidates
            .iter()
            .enumerate()
            .filter(|(index, _)| !used[*index])
            .map(|(index, real)| (day_distance(real.due_date, slot), real.due_date, &real.id, index))
            .filter(|(distance, ..)| *distance <= window)
            .min();

        match nearest {
            Some((_, _, id, index)) => {
                used[index] = true;
                outcome.consumed.push(id.clone());
            }
            None => outcome.projections.push(project(rule, slot)),
        }
    }

    outcome
}

/// Absolute distance between two dates in days.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
