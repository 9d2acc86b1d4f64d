//! Display formatting for durations, money, and ledger lines.

use chrono::{DateTime, Utc};
use kerb_core::{Movement, TickSnapshot};
use rust_decimal::Decimal;

/// `01:02:05` style. Negative inputs read as zero.
pub fn format_hms(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Money for humans: two decimal places, ledger keeps four.
pub fn format_money(amount: &Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Money with an explicit sign, for ledger lines.
pub fn format_signed_money(amount: &Decimal) -> String {
    if amount.is_sign_negative() {
        format_money(amount)
    } else {
        format!("+{}", format_money(amount))
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_movement_line(movement: &Movement) -> String {
    format!(
        "{}  {:<14} {:>12}",
        format_timestamp(movement.recorded_at),
        movement.kind.as_str(),
        format_signed_money(&movement.amount)
    )
}

/// The single line `watch` repaints every tick.
pub fn format_tick_line(snapshot: &TickSnapshot, currency: &str) -> String {
    let right = if snapshot.limit_reached {
        "time is up".to_string()
    } else {
        format!("{} left", format_hms(snapshot.remaining_secs))
    };
    format!(
        "{} elapsed | {} {} | {}",
        format_hms(snapshot.elapsed_secs),
        format_money(&snapshot.display_cost),
        currency,
        right
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kerb_core::MovementKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3725), "01:02:05");
        assert_eq!(format_hms(36_000), "10:00:00");
        assert_eq!(format_hms(-30), "00:00:00");
    }

    #[test]
    fn test_format_money_pads_to_cents() {
        assert_eq!(format_money(&dec!(80)), "80.00");
        assert_eq!(format_money(&dec!(0.0333)), "0.03");
        assert_eq!(format_money(&dec!(-120)), "-120.00");
    }

    #[test]
    fn test_format_signed_money() {
        assert_eq!(format_signed_money(&dec!(200)), "+200.00");
        assert_eq!(format_signed_money(&dec!(-120)), "-120.00");
        assert_eq!(format_signed_money(&dec!(0)), "+0.00");
    }

    #[test]
    fn test_format_movement_line() {
        let movement = Movement {
            id: "01JFMT00000000000000000000".to_string(),
            kind: MovementKind::ParkingDebit,
            amount: dec!(-120),
            recorded_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        };
        assert_eq!(
            format_movement_line(&movement),
            "2025-06-01 09:00:00 UTC  parking_debit       -120.00"
        );
    }

    #[test]
    fn test_format_tick_line_mid_session() {
        let snapshot = TickSnapshot {
            session_id: "01JFMT00000000000000000000".to_string(),
            elapsed_secs: 900,
            remaining_secs: 6300,
            display_cost: dec!(30),
            limit_reached: false,
            captured_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 15, 0).unwrap(),
        };
        assert_eq!(
            format_tick_line(&snapshot, "EUR"),
            "00:15:00 elapsed | 30.00 EUR | 01:45:00 left"
        );
    }

    #[test]
    fn test_format_tick_line_at_the_limit() {
        let snapshot = TickSnapshot {
            session_id: "01JFMT00000000000000000000".to_string(),
            elapsed_secs: 7200,
            remaining_secs: 0,
            display_cost: dec!(240),
            limit_reached: true,
            captured_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        };
        assert_eq!(
            format_tick_line(&snapshot, "EUR"),
            "02:00:00 elapsed | 240.00 EUR | time is up"
        );
    }
}
