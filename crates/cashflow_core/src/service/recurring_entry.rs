//! Entry-with-recurrence orchestration.
//!
//! # Responsibility
//! - Turn one "new recurring obligation" input into a rule, its originating
//!   commitment and every pending occurrence up to the horizon.
//! - Persist the whole series through `SeriesRepository` in one unit.
//!
//! # Invariants
//! - This path writes real rows; it never goes through projection.
//! - `rule.last_generated_date` is the last materialized due date.
//! - On any failure no row of the series remains.

use chrono::{Days, Local, Months, NaiveDate};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CashflowService, ServiceResult};
use crate::model::commitment::{Commitment, CommitmentStatus, NewCommitment};
use crate::model::rule::{Frequency, NewRecurrenceRule, RecurrenceRule};
use crate::model::{now_epoch_ms, ValidationError};
use crate::repo::CashflowStore;
use crate::schedule::{expand, DateRange};

/// Input for a new recurring obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurringEntry {
    pub title: String,
    pub amount: Option<Decimal>,
    /// Due date of the originating commitment; also the rule start date.
    pub due_date: NaiveDate,
    /// Status of the originating commitment; defaults to `pending`.
    pub status: Option<CommitmentStatus>,
    pub paid_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub interval: Option<u32>,
    pub day_to_send: Option<u32>,
    pub end_date: Option<NaiveDate>,
}

/// Rule plus commitments written by one orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSeries {
    pub rule: RecurrenceRule,
    /// Originating commitment first, then future occurrences ascending.
    pub commitments: Vec<Commitment>,
}

/// Builds the full series without touching storage.
///
/// Future occurrences are the rule's due dates strictly after the entry's
/// due date and no later than `today + horizon_months`.
pub fn plan_series(
    entry: NewRecurringEntry,
    today: NaiveDate,
    horizon_months: u32,
    now_ms: i64,
) -> Result<RecurringSeries, ValidationError> {
    let rule_input = NewRecurrenceRule {
        id: None,
        title: entry.title.clone(),
        amount: entry.amount,
        frequency: entry.frequency,
        interval: entry.interval,
        day_to_send: entry.day_to_send,
        start_date: entry.due_date,
        end_date: entry.end_date,
        category: entry.category.clone(),
        is_active: Some(true),
    };
    let mut rule = rule_input.into_rule(now_ms)?;

    let origin = NewCommitment {
        id: None,
        title: entry.title,
        amount: rule.amount,
        due_date: entry.due_date,
        status: entry.status,
        paid_date: entry.paid_date,
        category: entry.category,
        recurrence_rule_id: Some(rule.id.clone()),
    }
    .into_commitment(now_ms);

    let horizon = today
        .checked_add_months(Months::new(horizon_months))
        .unwrap_or(NaiveDate::MAX);
    let future_dates: Vec<NaiveDate> = match entry.due_date.checked_add_days(Days::new(1)) {
        Some(first) => expand(&rule, DateRange::new(first, horizon)),
        None => Vec::new(),
    };

    rule.last_generated_date = Some(future_dates.last().copied().unwrap_or(entry.due_date));

    let mut commitments = Vec::with_capacity(future_dates.len() + 1);
    commitments.push(origin);
    commitments.extend(
        future_dates
            .into_iter()
            .map(|due_date| Commitment::materialized(&rule, due_date, now_ms)),
    );

    Ok(RecurringSeries { rule, commitments })
}

impl<S: CashflowStore> CashflowService<S> {
    /// Creates a recurring obligation anchored on the local current date.
    pub fn create_entry_with_recurrence(
        &self,
        entry: NewRecurringEntry,
    ) -> ServiceResult<RecurringSeries> {
        self.create_entry_with_recurrence_on(entry, Local::now().date_naive())
    }

    /// Creates a recurring obligation, materializing occurrences up to
    /// `today + horizon`.
    ///
    /// # Errors
    /// - `Validation` before any write when the entry is malformed.
    /// - `Storage` when the atomic series insert fails; nothing is kept.
    pub fn create_entry_with_recurrence_on(
        &self,
        entry: NewRecurringEntry,
        today: NaiveDate,
    ) -> ServiceResult<RecurringSeries> {
        let series = plan_series(
            entry,
            today,
            self.config.materialization.horizon_months,
            now_epoch_ms(),
        )?;
        self.store.insert_series(&series.rule, &series.commitments)?;

        info!(
            "event=recurring_entry_create module=service status=ok rule_id={} frequency={} commitments={} last_generated={}",
            series.rule.id,
            series.rule.frequency,
            series.commitments.len(),
            series
                .rule
                .last_generated_date
                .map(|date| date.to_string())
                .unwrap_or_default()
        );
        Ok(series)
    }
}
