//! Account balance and the append-only movement ledger.
//!
//! Convention: a debit movement records the nominal charge in full, while the
//! balance clamps at zero. Replaying the ledger with [`replay_balance`]
//! applies the same clamp per debit and reproduces the live balance exactly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::session::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Recharge,
    ParkingDebit,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Recharge => "recharge",
            MovementKind::ParkingDebit => "parking_debit",
        }
    }
}

/// One immutable ledger entry. Credits are positive, debits negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub kind: MovementKind,
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl Movement {
    fn new(kind: MovementKind, amount: Decimal, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            amount,
            recorded_at,
        }
    }
}

/// Prepaid account: current balance plus every movement that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Decimal,
    pub movements: Vec<Movement>,
}

impl Account {
    /// Appends a recharge and raises the balance. Amount must already be
    /// validated positive by the caller.
    pub fn record_credit(&mut self, amount: Decimal, now: DateTime<Utc>) -> Movement {
        let amount = round_money(amount);
        let movement = Movement::new(MovementKind::Recharge, amount, now);
        self.balance += amount;
        self.movements.push(movement.clone());
        movement
    }

    /// Appends a parking debit for the nominal charge and lowers the balance,
    /// clamping at zero.
    pub fn record_debit(&mut self, nominal: Decimal, now: DateTime<Utc>) -> Movement {
        let nominal = round_money(nominal);
        let movement = Movement::new(MovementKind::ParkingDebit, -nominal, now);
        self.balance = (self.balance - nominal).max(Decimal::ZERO);
        self.movements.push(movement.clone());
        movement
    }
}

/// Rebuilds the balance a movement sequence produces under the clamp rule.
pub fn replay_balance(movements: &[Movement]) -> Decimal {
    movements
        .iter()
        .fold(Decimal::ZERO, |balance, movement| match movement.kind {
            MovementKind::Recharge => balance + movement.amount,
            MovementKind::ParkingDebit => (balance + movement.amount).max(Decimal::ZERO),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_credit_raises_balance_and_appends_movement() {
        let mut account = Account::default();
        let movement = account.record_credit(dec!(50), now());

        assert_eq!(account.balance, dec!(50));
        assert_eq!(account.movements.len(), 1);
        assert_eq!(movement.kind, MovementKind::Recharge);
        assert_eq!(movement.amount, dec!(50));
        assert_eq!(movement.recorded_at, now());
    }

    #[test]
    fn test_debit_records_nominal_and_clamps_balance() {
        let mut account = Account::default();
        account.record_credit(dec!(50), now());
        let movement = account.record_debit(dec!(120), now());

        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(movement.amount, dec!(-120));
    }

    #[test]
    fn test_debit_without_shortfall_subtracts_exactly() {
        let mut account = Account::default();
        account.record_credit(dec!(200), now());
        account.record_debit(dec!(120), now());

        assert_eq!(account.balance, dec!(80));
    }

    #[test]
    fn test_movements_get_unique_ids() {
        let mut account = Account::default();
        let a = account.record_credit(dec!(10), now());
        let b = account.record_credit(dec!(10), now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_replay_reproduces_balance_including_clamp() {
        let mut account = Account::default();
        account.record_credit(dec!(50), now());
        account.record_debit(dec!(120), now());
        account.record_credit(dec!(30), now());
        account.record_debit(dec!(10), now());

        assert_eq!(replay_balance(&account.movements), account.balance);
        assert_eq!(account.balance, dec!(20));
    }

    #[test]
    fn test_replay_of_empty_ledger_is_zero() {
        assert_eq!(replay_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_amounts_are_rounded_to_ledger_scale() {
        let mut account = Account::default();
        let movement = account.record_credit(dec!(10.00009), now());
        assert_eq!(movement.amount, dec!(10.0001));
        assert_eq!(account.balance, dec!(10.0001));
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(MovementKind::Recharge.as_str(), "recharge");
        assert_eq!(MovementKind::ParkingDebit.as_str(), "parking_debit");
    }
}
