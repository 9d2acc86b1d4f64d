//! # kerb-core
//!
//! Core library for Kerb, providing the parking-session billing engine shared
//! by all clients (mobile app, CLI).
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap with async if needed.
//! - **One writer**: `SessionStore` owns the session and account; everything
//!   else reads snapshots or receives notifications.
//! - **Ticks display, settlements debit**: the accrual clock recomputes what
//!   the screen shows; only explicit store operations touch the balance.
//! - **Injected time**: all of it runs against a `Clock`, so tests drive the
//!   timeline by hand.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kerb_core::{SessionStore, StartRequest, SystemClock};
//! use std::sync::Arc;
//!
//! let store = SessionStore::new(Arc::new(SystemClock));
//! store.credit_balance(dec!(20))?;
//! store.start(StartRequest { /* plate, location, rate, limit */ })?;
//! let debit = store.recalculate_and_debit()?;
//! ```

// Public modules
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod sink;
pub mod storage;
pub mod store;
pub mod ticker;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BillingConfig;
pub use error::{BillingError, Result};
pub use ledger::{replay_balance, Account, Movement, MovementKind};
pub use session::{
    normalize_plate, ParkingSession, MAX_CREDIT_AMOUNT, MAX_HOURLY_RATE, MAX_LIMIT_HOURS,
    MONEY_SCALE,
};
pub use sink::StateSink;
pub use storage::{FileStore, StoragePaths};
pub use store::{BalanceAudit, DebitResult, FinalizeResult, SessionStore, StartRequest};
pub use ticker::{project, AccrualClock, TickObserver, TickSnapshot, DEFAULT_TICK_INTERVAL};
