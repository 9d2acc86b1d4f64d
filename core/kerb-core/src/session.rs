//! Parking session record and the cost math every settlement shares.
//!
//! All money is `rust_decimal::Decimal`; elapsed time is measured in whole
//! seconds (floor), the same rule the display ticker uses, so a settlement
//! and a tick taken at the same instant always agree on the cost.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};

/// Ledger amounts carry two guard digits below a cent.
pub const MONEY_SCALE: u32 = 4;

pub const SECONDS_PER_HOUR: i64 = 3_600;

// Upper bounds on operator input. With these caps every intermediate in the
// cost math stays far inside `Decimal` range.

/// Highest hourly rate a session can be started with.
pub const MAX_HOURLY_RATE: Decimal = dec!(10000);

/// Longest paid-for window a session can reach, in hours (one year).
pub const MAX_LIMIT_HOURS: Decimal = dec!(8760);

/// Largest single top-up the account accepts.
pub const MAX_CREDIT_AMOUNT: Decimal = dec!(100000);

// 2 to 12 chars, uppercase alphanumeric with inner spaces or dashes.
static RE_PLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9 -]{0,10}[A-Z0-9]$").unwrap());

/// Rounds a money amount to the ledger scale.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// Trims and uppercases a raw plate string before validation.
pub fn normalize_plate(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn is_valid_plate(plate: &str) -> bool {
    RE_PLATE.is_match(plate)
}

/// The one active parking session.
///
/// `accrued_cost` is the cost already recognized against the account balance.
/// It only moves through `SessionStore` settlements, never through display
/// ticks, and it never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub id: String,
    pub plate: String,
    pub location: String,
    pub started_at: DateTime<Utc>,
    pub hourly_rate: Decimal,
    pub limit_hours: Decimal,
    pub accrued_cost: Decimal,
}

impl ParkingSession {
    /// Paid-for window in whole seconds.
    pub fn limit_secs(&self) -> i64 {
        (self.limit_hours * Decimal::from(SECONDS_PER_HOUR))
            .trunc()
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Instant the paid-for window runs out.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::seconds(self.limit_secs())
    }

    /// Whole seconds elapsed since start, or `ClockSkew` when `now` precedes
    /// the session start. Callers decide whether skew is an error or a no-op.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Result<i64> {
        if now < self.started_at {
            return Err(BillingError::ClockSkew {
                behind_secs: (self.started_at - now).num_seconds(),
            });
        }
        Ok((now - self.started_at).num_seconds())
    }

    /// Elapsed seconds capped at the paid-for window.
    pub fn billable_secs(&self, now: DateTime<Utc>) -> Result<i64> {
        Ok(self.elapsed_secs(now)?.min(self.limit_secs()))
    }

    /// Cost of `secs` seconds at this session's hourly rate, rounded to the
    /// ledger scale.
    pub fn cost_for_secs(&self, secs: i64) -> Decimal {
        round_money(Decimal::from(secs) * self.hourly_rate / Decimal::from(SECONDS_PER_HOUR))
    }

    /// Cost accrued up to `now`, capped at the limit.
    pub fn current_cost(&self, now: DateTime<Utc>) -> Result<Decimal> {
        Ok(self.cost_for_secs(self.billable_secs(now)?))
    }

    pub fn extend_limit(&mut self, extra_hours: Decimal) {
        self.limit_hours += extra_hours;
    }
}
