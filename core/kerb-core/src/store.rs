//! Single source of truth for the active parking session and the account.
//!
//! Every financial mutation happens inside one lock acquisition: the current
//! `accrued_cost` is read, the delta computed, and both the ledger and the
//! session snapshot updated before the lock drops. No interleaving of ticks,
//! refreshes, extensions, or finalization can recognize the same elapsed
//! interval twice. Sinks are notified after the lock is released, session
//! snapshot before the financial events.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{BillingError, Result};
use crate::ledger::{replay_balance, Account, Movement};
use crate::session::{
    is_valid_plate, normalize_plate, ParkingSession, MAX_CREDIT_AMOUNT, MAX_HOURLY_RATE,
    MAX_LIMIT_HOURS,
};
use crate::sink::StateSink;

/// Inputs for starting a session. Plate is normalized before validation.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub plate: String,
    pub location: String,
    pub hourly_rate: Decimal,
    pub limit_hours: Decimal,
}

/// What one settlement did. `delta` is zero when nothing new was owed, in
/// which case no movement was appended.
#[derive(Debug, Clone, PartialEq)]
pub struct DebitResult {
    pub delta: Decimal,
    pub accrued_cost: Decimal,
    pub balance: Decimal,
    pub movement: Option<Movement>,
}

/// Result of closing a session: the full cost recognized over its lifetime,
/// the closing movement if the last settlement owed anything, and the ended
/// session record.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeResult {
    pub total_cost: Decimal,
    pub balance: Decimal,
    pub movement: Option<Movement>,
    pub session: ParkingSession,
    pub ended_at: DateTime<Utc>,
}

/// Live balance next to the balance the ledger replays to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceAudit {
    pub live: Decimal,
    pub replayed: Decimal,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.live == self.replayed
    }
}

struct StoreState {
    session: Option<ParkingSession>,
    account: Account,
}

struct Settlement {
    delta: Decimal,
    accrued_cost: Decimal,
    balance: Decimal,
    movement: Option<Movement>,
    session: ParkingSession,
}

pub struct SessionStore {
    clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn StateSink>>,
    state: Mutex<StoreState>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_state(clock, Account::default(), None)
    }

    /// Resumes from persisted state, e.g. after the host process restarts
    /// while a session is still active.
    pub fn with_state(
        clock: Arc<dyn Clock>,
        account: Account,
        session: Option<ParkingSession>,
    ) -> Self {
        Self {
            clock,
            sinks: Vec::new(),
            state: Mutex::new(StoreState { session, account }),
        }
    }

    /// Registers a sink. Call before sharing the store across threads.
    pub fn add_sink(&mut self, sink: Arc<dyn StateSink>) {
        self.sinks.push(sink);
    }

    /// The time source this store settles against.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────

    /// Starts a session. Fails with `SessionAlreadyActive` if one is active;
    /// has no effect on the balance.
    pub fn start(&self, request: StartRequest) -> Result<ParkingSession> {
        let plate = normalize_plate(&request.plate);
        if !is_valid_plate(&plate) {
            return Err(BillingError::InvalidPlate { plate });
        }
        let location = request.location.trim().to_string();
        if location.is_empty() {
            return Err(BillingError::EmptyLocation);
        }
        if request.hourly_rate < Decimal::ZERO || request.hourly_rate > MAX_HOURLY_RATE {
            return Err(BillingError::InvalidRate {
                rate: request.hourly_rate,
            });
        }
        if request.limit_hours <= Decimal::ZERO || request.limit_hours > MAX_LIMIT_HOURS {
            return Err(BillingError::InvalidDuration {
                hours: request.limit_hours,
            });
        }

        let session = {
            let mut state = self.lock_state();
            if let Some(active) = state.session.as_ref() {
                return Err(BillingError::SessionAlreadyActive {
                    plate: active.plate.clone(),
                });
            }
            let session = ParkingSession {
                id: ulid::Ulid::new().to_string(),
                plate,
                location,
                started_at: self.clock.now(),
                hourly_rate: request.hourly_rate,
                limit_hours: request.limit_hours,
                accrued_cost: Decimal::ZERO,
            };
            state.session = Some(session.clone());
            session
        };

        info!(
            session_id = %session.id,
            plate = %session.plate,
            location = %session.location,
            hourly_rate = %session.hourly_rate,
            limit_hours = %session.limit_hours,
            "Parking session started"
        );
        self.notify_session_changed(Some(&session));
        Ok(session)
    }

    /// Lengthens the paid-for window. Start time and rate are untouched.
    /// The extended window stays within `MAX_LIMIT_HOURS`.
    pub fn extend(&self, extra_hours: Decimal) -> Result<ParkingSession> {
        if extra_hours <= Decimal::ZERO || extra_hours > MAX_LIMIT_HOURS {
            return Err(BillingError::InvalidDuration { hours: extra_hours });
        }
        let session = {
            let mut state = self.lock_state();
            let session = state.session.as_mut().ok_or(BillingError::NoActiveSession)?;
            if session.limit_hours + extra_hours > MAX_LIMIT_HOURS {
                return Err(BillingError::InvalidDuration { hours: extra_hours });
            }
            session.extend_limit(extra_hours);
            session.clone()
        };

        info!(
            session_id = %session.id,
            extra_hours = %extra_hours,
            limit_hours = %session.limit_hours,
            "Parking session extended"
        );
        self.notify_session_changed(Some(&session));
        Ok(session)
    }

    /// Settles cost accrued since the last settlement and debits the balance.
    ///
    /// Idempotent at a fixed instant: the second call sees a zero delta and
    /// appends nothing. A backward-moving clock is also a zero delta.
    pub fn recalculate_and_debit(&self) -> Result<DebitResult> {
        let now = self.clock.now();
        let settlement = {
            let mut state = self.lock_state();
            settle(&mut state, now)?
        };

        if let Some(movement) = settlement.movement.as_ref() {
            info!(
                session_id = %settlement.session.id,
                delta = %settlement.delta,
                accrued_cost = %settlement.accrued_cost,
                balance = %settlement.balance,
                "Parking debit settled"
            );
            // Session snapshot first. A persistence sink that stops
            // mid-sequence then resumes with the advanced accrued_cost
            // instead of re-debiting the settled interval.
            self.notify_session_changed(Some(&settlement.session));
            self.notify_movement_appended(movement);
            self.notify_balance_changed(settlement.balance);
        }

        Ok(DebitResult {
            delta: settlement.delta,
            accrued_cost: settlement.accrued_cost,
            balance: settlement.balance,
            movement: settlement.movement,
        })
    }

    /// Runs one last settlement, clears the session, and reports the total
    /// cost. Charges exactly the elapsed time up to the limit; ending early
    /// costs nothing extra.
    pub fn finalize(&self) -> Result<FinalizeResult> {
        let now = self.clock.now();
        let settlement = {
            let mut state = self.lock_state();
            let settlement = settle(&mut state, now)?;
            state.session = None;
            settlement
        };

        info!(
            session_id = %settlement.session.id,
            total_cost = %settlement.accrued_cost,
            balance = %settlement.balance,
            "Parking session finalized"
        );
        // Same ordering as settle: the cleared session goes out before
        // the financial events.
        self.notify_session_changed(None);
        if let Some(movement) = settlement.movement.as_ref() {
            self.notify_movement_appended(movement);
            self.notify_balance_changed(settlement.balance);
        }

        Ok(FinalizeResult {
            total_cost: settlement.accrued_cost,
            balance: settlement.balance,
            movement: settlement.movement,
            session: settlement.session,
            ended_at: now,
        })
    }

    /// Tops up the balance. Valid while idle or active.
    pub fn credit_balance(&self, amount: Decimal) -> Result<Movement> {
        if amount <= Decimal::ZERO || amount > MAX_CREDIT_AMOUNT {
            return Err(BillingError::InvalidAmount { amount });
        }
        let (movement, balance) = {
            let mut state = self.lock_state();
            let movement = state.account.record_credit(amount, self.clock.now());
            (movement, state.account.balance)
        };

        info!(amount = %movement.amount, balance = %balance, "Balance recharged");
        self.notify_movement_appended(&movement);
        self.notify_balance_changed(balance);
        Ok(movement)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read Access
    // ─────────────────────────────────────────────────────────────────────

    pub fn active_session(&self) -> Option<ParkingSession> {
        self.lock_state().session.clone()
    }

    pub fn balance(&self) -> Decimal {
        self.lock_state().account.balance
    }

    pub fn movements(&self) -> Vec<Movement> {
        self.lock_state().account.movements.clone()
    }

    pub fn movement_count(&self) -> usize {
        self.lock_state().account.movements.len()
    }

    /// Replays the ledger and compares it against the live balance.
    pub fn audit_balance(&self) -> BalanceAudit {
        let state = self.lock_state();
        BalanceAudit {
            live: state.account.balance,
            replayed: replay_balance(&state.account.movements),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        // Recover from poisoning - state is only mutated by committed operations
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify_session_changed(&self, session: Option<&ParkingSession>) {
        for sink in &self.sinks {
            if let Err(err) = sink.session_changed(session) {
                warn!(error = %err, "State sink failed on session change");
            }
        }
    }

    fn notify_balance_changed(&self, balance: Decimal) {
        for sink in &self.sinks {
            if let Err(err) = sink.balance_changed(balance) {
                warn!(error = %err, "State sink failed on balance change");
            }
        }
    }

    fn notify_movement_appended(&self, movement: &Movement) {
        for sink in &self.sinks {
            if let Err(err) = sink.movement_appended(movement) {
                warn!(error = %err, "State sink failed on movement append");
            }
        }
    }
}

/// The shared settlement step. Computes the capped current cost, recognizes
/// any positive delta as a ledger debit, and advances `accrued_cost`.
fn settle(state: &mut StoreState, now: DateTime<Utc>) -> Result<Settlement> {
    let session = state.session.as_mut().ok_or(BillingError::NoActiveSession)?;

    let current_cost = match session.current_cost(now) {
        Ok(cost) => cost,
        Err(BillingError::ClockSkew { behind_secs }) => {
            warn!(
                session_id = %session.id,
                behind_secs,
                "Clock skew during settlement; treating as zero delta"
            );
            session.accrued_cost
        }
        Err(other) => return Err(other),
    };

    let delta = current_cost - session.accrued_cost;
    if delta <= Decimal::ZERO {
        return Ok(Settlement {
            delta: Decimal::ZERO,
            accrued_cost: session.accrued_cost,
            balance: state.account.balance,
            movement: None,
            session: session.clone(),
        });
    }

    let movement = state.account.record_debit(delta, now);
    session.accrued_cost = current_cost;
    Ok(Settlement {
        delta,
        accrued_cost: current_cost,
        balance: state.account.balance,
        movement: Some(movement),
        session: session.clone(),
    })
}
