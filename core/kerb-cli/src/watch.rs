//! Live session display loop.
//!
//! Runs the accrual clock against the store and repaints one status line per
//! tick. Display never debits; with `--settle-every` the loop also runs a
//! periodic settlement in the role the app's coarse polling plays. Runs until
//! interrupted or the session ends.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::warn;

use kerb_core::{AccrualClock, SessionStore, TickObserver, TickSnapshot};

use crate::fmt::{format_money, format_tick_line};

const POLL_SLEEP: Duration = Duration::from_millis(200);

struct LinePainter {
    currency: String,
}

impl TickObserver for LinePainter {
    fn on_tick(&self, snapshot: &TickSnapshot) {
        print!("\r{}", format_tick_line(snapshot, &self.currency));
        let _ = std::io::stdout().flush();
    }
}

pub fn run(
    store: Arc<SessionStore>,
    tick_interval: Duration,
    currency: &str,
    settle_every: Option<u64>,
) -> Result<(), String> {
    let session = store
        .active_session()
        .ok_or_else(|| "No active parking session".to_string())?;
    println!(
        "Watching session for {} at {} (Ctrl-C to leave it running)",
        session.plate, session.location
    );

    let observer = Arc::new(LinePainter {
        currency: currency.to_string(),
    });
    let ticker = AccrualClock::spawn(store.clone(), observer, tick_interval);

    let settle_period = settle_every.map(Duration::from_secs);
    let mut last_settle = Instant::now();
    loop {
        if ticker.is_finished() {
            break;
        }
        if let Some(period) = settle_period {
            if last_settle.elapsed() >= period {
                last_settle = Instant::now();
                settle_once(&store, currency);
            }
        }
        thread::sleep(POLL_SLEEP);
    }

    ticker.stop();
    println!();
    Ok(())
}

fn settle_once(store: &SessionStore, currency: &str) {
    match store.recalculate_and_debit() {
        Ok(result) if result.delta > Decimal::ZERO => {
            // own line, so the next tick repaint does not eat it
            println!();
            println!(
                "Settled {} {}; balance {} {}",
                format_money(&result.delta),
                currency,
                format_money(&result.balance),
                currency
            );
        }
        Ok(_) => {}
        Err(err) => {
            warn!(error = %err, "Periodic settlement failed");
        }
    }
}
