//! Outbound seam for persistence and UI notification.
//!
//! The store calls these after a mutation has committed, outside its lock.
//! Notifications are fire-and-forget: a failing sink is logged by the caller
//! and never rolls back or retries the operation.

use rust_decimal::Decimal;

use crate::ledger::Movement;
use crate::session::ParkingSession;

pub trait StateSink: Send + Sync {
    /// Active session changed: started, extended, settled, or `None` after
    /// finalize.
    fn session_changed(&self, _session: Option<&ParkingSession>) -> Result<(), String> {
        Ok(())
    }

    fn balance_changed(&self, _balance: Decimal) -> Result<(), String> {
        Ok(())
    }

    fn movement_appended(&self, _movement: &Movement) -> Result<(), String> {
        Ok(())
    }
}
