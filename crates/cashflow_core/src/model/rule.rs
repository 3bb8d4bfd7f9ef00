//! Recurrence rule domain model.
//!
//! # Responsibility
//! - Define the template that drives schedule expansion.
//! - Apply creation defaults and partial patches with validation.
//!
//! # Invariants
//! - `interval >= 1`.
//! - `day_to_send` is a weekday (0 = Sunday .. 6 = Saturday) for weekly
//!   rules and a day-of-month (1..=31) for monthly/yearly rules.
//! - `end_date`, when set, is not earlier than `start_date`.
//! - Editing a rule never touches commitments that were already materialized.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use super::{new_record_id, patch_nullable, ValidationError};

/// Stable identifier for a recurrence rule.
pub type RuleId = String;

/// Period unit of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Inclusive bounds accepted for `day_to_send`.
    pub fn day_to_send_bounds(self) -> (u32, u32) {
        match self {
            Self::Weekly => (0, 6),
            Self::Monthly | Self::Yearly => (1, 31),
        }
    }

    /// Natural anchor day for a date: weekday for weekly rules, day-of-month
    /// otherwise.
    pub fn anchor_day(self, date: NaiveDate) -> u32 {
        match self {
            Self::Weekly => date.weekday().num_days_from_sunday(),
            Self::Monthly | Self::Yearly => date.day(),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template describing a repeating series of commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub title: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    /// Repeat every N periods.
    pub interval: u32,
    pub day_to_send: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category: String,
    pub is_active: bool,
    /// High-water mark of eager materialization.
    pub last_generated_date: Option<NaiveDate>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl RecurrenceRule {
    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.interval == 0 {
            return Err(ValidationError::ZeroInterval);
        }

        let (min, max) = self.frequency.day_to_send_bounds();
        if self.day_to_send < min || self.day_to_send > max {
            return Err(ValidationError::DayToSendOutOfRange {
                frequency: self.frequency,
                value: self.day_to_send,
                min,
                max,
            });
        }

        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ValidationError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }

        Ok(())
    }

    /// Applies only the supplied patch fields and bumps `updated_at`.
    ///
    /// The rule is left untouched when the patched shape fails validation.
    pub fn apply_patch(&mut self, patch: &RulePatch, now_ms: i64) -> Result<(), ValidationError> {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(amount) = patch.amount {
            next.amount = amount;
        }
        if let Some(frequency) = patch.frequency {
            next.frequency = frequency;
        }
        if let Some(interval) = patch.interval {
            next.interval = interval;
        }
        if let Some(day_to_send) = patch.day_to_send {
            next.day_to_send = day_to_send;
        }
        if let Some(start_date) = patch.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            next.end_date = end_date;
        }
        if let Some(category) = &patch.category {
            next.category = category.clone();
        }
        if let Some(is_active) = patch.is_active {
            next.is_active = is_active;
        }
        if let Some(last_generated_date) = patch.last_generated_date {
            next.last_generated_date = last_generated_date;
        }

        next.validate()?;
        next.updated_at = now_ms;
        *self = next;
        Ok(())
    }
}

/// Creation input for a recurrence rule.
///
/// Omitted optional fields take defaults in [`NewRecurrenceRule::into_rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurrenceRule {
    /// Caller-provided id for seeding/import paths.
    pub id: Option<RuleId>,
    pub title: String,
    pub amount: Option<Decimal>,
    pub frequency: Frequency,
    pub interval: Option<u32>,
    /// Defaults to the anchor day of `start_date`.
    pub day_to_send: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

impl NewRecurrenceRule {
    /// Builds a minimal active rule input anchored on `start_date`.
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            amount: Some(amount),
            frequency,
            interval: None,
            day_to_send: None,
            start_date,
            end_date: None,
            category: None,
            is_active: None,
        }
    }

    /// Resolves defaults and validates the resulting rule.
    ///
    /// # Errors
    /// - `EmptyTitle` / `MissingAmount` when required fields are absent.
    /// - Any field-level violation from [`RecurrenceRule::validate`].
    pub fn into_rule(self, now_ms: i64) -> Result<RecurrenceRule, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let amount = self.amount.ok_or(ValidationError::MissingAmount)?;

        let rule = RecurrenceRule {
            id: self.id.unwrap_or_else(new_record_id),
            title: self.title,
            amount,
            frequency: self.frequency,
            interval: self.interval.unwrap_or(1),
            day_to_send: self
                .day_to_send
                .unwrap_or_else(|| self.frequency.anchor_day(self.start_date)),
            start_date: self.start_date,
            end_date: self.end_date,
            category: self.category.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            last_generated_date: None,
            created_at: now_ms,
            updated_at: now_ms,
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// Partial update for a recurrence rule. `None` keeps the stored value.
///
/// Nullable fields use `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulePatch {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub day_to_send: Option<u32>,
    pub start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "patch_nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    #[serde(deserialize_with = "patch_nullable")]
    pub last_generated_date: Option<Option<NaiveDate>>,
}
