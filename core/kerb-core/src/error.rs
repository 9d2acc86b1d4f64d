//! Error types for kerb-core operations.
//! Every billing operation returns one of these synchronously; none is fatal.

use rust_decimal::Decimal;

use crate::session::{MAX_CREDIT_AMOUNT, MAX_HOURLY_RATE, MAX_LIMIT_HOURS};

/// All errors that can occur in kerb-core operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    // ─────────────────────────────────────────────────────────────────────
    // Session Lifecycle Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("A parking session is already active for plate {plate}")]
    SessionAlreadyActive { plate: String },

    #[error("No active parking session")]
    NoActiveSession,

    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid duration: {hours} hours (must be positive, at most {})", MAX_LIMIT_HOURS)]
    InvalidDuration { hours: Decimal },

    #[error("Invalid amount: {amount} (must be positive, at most {})", MAX_CREDIT_AMOUNT)]
    InvalidAmount { amount: Decimal },

    #[error("Invalid hourly rate: {rate} (must be between 0 and {})", MAX_HOURLY_RATE)]
    InvalidRate { rate: Decimal },

    #[error("Invalid plate: {plate:?}")]
    InvalidPlate { plate: String },

    #[error("Location must not be empty")]
    EmptyLocation,

    // ─────────────────────────────────────────────────────────────────────
    // Time Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Clock skew: current time precedes session start by {behind_secs}s")]
    ClockSkew { behind_secs: i64 },
}

/// Convenience type alias for Results using BillingError.
pub type Result<T> = std::result::Result<T, BillingError>;

// Conversion for string error compatibility at sink/storage seams
impl From<BillingError> for String {
    fn from(err: BillingError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages_name_the_offending_value() {
        let err = BillingError::InvalidDuration { hours: dec!(-1) };
        assert!(err.to_string().contains("-1"));

        let err = BillingError::InvalidAmount { amount: dec!(0) };
        assert!(err.to_string().contains("0"));

        let err = BillingError::ClockSkew { behind_secs: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_input_error_messages_name_the_caps() {
        let err = BillingError::InvalidRate { rate: dec!(10001) };
        assert!(err.to_string().contains("10000"));

        let err = BillingError::InvalidDuration { hours: dec!(9000) };
        assert!(err.to_string().contains("8760"));

        let err = BillingError::InvalidAmount { amount: dec!(100001) };
        assert!(err.to_string().contains("100000"));
    }

    #[test]
    fn test_error_converts_to_string() {
        let msg: String = BillingError::NoActiveSession.into();
        assert_eq!(msg, "No active parking session");
    }
}
