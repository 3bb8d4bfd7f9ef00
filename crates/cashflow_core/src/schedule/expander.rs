//! Schedule expansion for one recurrence rule.
//!
//! # Invariants
//! - Output is a pure function of `(rule, range)`, ascending and finite.
//! - Step `k` is computed from the anchor (`start_date + k * interval`
//!   periods), so month-end clamping never accumulates drift.
//! - Monthly/yearly days are clamped to the month length; a 31st never rolls
//!   into the next month.

use chrono::{Datelike, Days, Months, NaiveDate};

use super::DateRange;
use crate::model::rule::{Frequency, RecurrenceRule};

/// Lazy iterator over the ideal due dates of one rule inside a range.
#[derive(Debug, Clone)]
pub struct Occurrences {
    frequency: Frequency,
    interval: u32,
    day_to_send: u32,
    anchor: NaiveDate,
    lower: NaiveDate,
    upper: NaiveDate,
    step: u32,
    done: bool,
}

/// Enumerates `rule` due dates within `range`.
///
/// Dates before `rule.start_date` or after `rule.end_date` are never
/// produced. Inactive rules produce nothing.
pub fn occurrences(rule: &RecurrenceRule, range: DateRange) -> Occurrences {
    let interval = rule.interval.max(1);
    let lower = range.start.max(rule.start_date);
    let upper = match rule.end_date {
        Some(end) => range.end.min(end),
        None => range.end,
    };
    let done = !rule.is_active || lower > upper;

    let mut iter = Occurrences {
        frequency: rule.frequency,
        interval,
        day_to_send: rule.day_to_send,
        anchor: rule.start_date,
        lower,
        upper,
        step: 0,
        done,
    };
    if !done {
        iter.step = iter.first_step();
    }
    iter
}

/// Collects [`occurrences`] into a vector.
pub fn expand(rule: &RecurrenceRule, range: DateRange) -> Vec<NaiveDate> {
    occurrences(rule, range).collect()
}

impl Occurrences {
    /// Step just before the first raw candidate that reaches `lower`.
    ///
    /// Alignment can move a candidate backwards within its period, so the
    /// preceding step is also inspected and filtered by `next`.
    fn first_step(&self) -> u32 {
        let elapsed_steps = match self.frequency {
            Frequency::Weekly => {
                let days = (self.lower - self.anchor).num_days().max(0);
                days / (7 * i64::from(self.interval))
            }
            Frequency::Monthly | Frequency::Yearly => {
                let months = month_index(self.lower) - month_index(self.anchor);
                months.max(0) / i64::from(self.months_per_step())
            }
        };
        u32::try_from(elapsed_steps)
            .unwrap_or(u32::MAX)
            .saturating_sub(1)
    }

    fn months_per_step(&self) -> u32 {
        match self.frequency {
            Frequency::Yearly => self.interval.saturating_mul(12),
            Frequency::Weekly | Frequency::Monthly => self.interval,
        }
    }

    fn raw_candidate(&self, step: u32) -> Option<NaiveDate> {
        match self.frequency {
            Frequency::Weekly => {
                let days = u64::from(step) * 7 * u64::from(self.interval);
                self.anchor.checked_add_days(Days::new(days))
            }
            Frequency::Monthly | Frequency::Yearly => {
                let months = step.checked_mul(self.months_per_step())?;
                self.anchor.checked_add_months(Months::new(months))
            }
        }
    }

    fn align(&self, raw: NaiveDate) -> Option<NaiveDate> {
        match self.frequency {
            Frequency::Weekly => {
                let current = i64::from(raw.weekday().num_days_from_sunday());
                let delta = i64::from(self.day_to_send) - current;
                if delta >= 0 {
                    raw.checked_add_days(Days::new(delta.unsigned_abs()))
                } else {
                    raw.checked_sub_days(Days::new(delta.unsigned_abs()))
                }
            }
            Frequency::Monthly | Frequency::Yearly => {
                let day = self.day_to_send.min(days_in_month(raw.year(), raw.month()));
                NaiveDate::from_ymd_opt(raw.year(), raw.month(), day)
            }
        }
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let aligned = self
                .raw_candidate(self.step)
                .and_then(|raw| self.align(raw));
            self.step = self.step.saturating_add(1);

            let Some(aligned) = aligned else {
                self.done = true;
                break;
            };
            // Aligned dates strictly increase with the step.
            if aligned > self.upper {
                self.done = true;
                break;
            }
            if aligned >= self.lower {
                return Some(aligned);
            }
        }
        None
    }
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
