//! kerb: parking session billing from the command line.
//!
//! Thin host around kerb-core in the role the mobile app plays: wires config
//! and the state file into a `SessionStore`, then maps one subcommand onto
//! each billing operation.
//!
//! ## Subcommands
//!
//! - `start` / `extend` / `refresh` / `finalize`: session lifecycle
//! - `credit` / `status` / `audit`: account and ledger
//! - `watch`: live ticker display, optionally settling at a coarse cadence

mod fmt;
mod logging;
mod watch;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use kerb_core::{
    project, BillingConfig, FileStore, SessionStore, StartRequest, StoragePaths, SystemClock,
};

use fmt::{format_hms, format_money, format_movement_line, format_timestamp};

const STATUS_MOVEMENT_LINES: usize = 5;

#[derive(Parser)]
#[command(name = "kerb")]
#[command(about = "Parking session billing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a parking session
    Start {
        /// Vehicle plate, e.g. ABC123
        #[arg(value_name = "PLATE")]
        plate: String,

        /// Parking location or zone
        #[arg(value_name = "LOCATION")]
        location: String,

        /// Hourly rate (defaults to config)
        #[arg(long)]
        rate: Option<Decimal>,

        /// Paid-for hours (defaults to config)
        #[arg(long)]
        hours: Option<Decimal>,
    },

    /// Add paid hours to the active session
    Extend {
        #[arg(value_name = "HOURS")]
        hours: Decimal,
    },

    /// Settle accrued cost against the balance now
    Refresh,

    /// Settle and close the active session
    Finalize,

    /// Top up the account balance
    Credit {
        #[arg(value_name = "AMOUNT")]
        amount: Decimal,
    },

    /// Show balance, active session, and recent movements
    Status,

    /// Check the live balance against a replay of the ledger
    Audit,

    /// Live display of the running session (until interrupted)
    Watch {
        /// Also settle the balance every N seconds
        #[arg(long, value_name = "SECS")]
        settle_every: Option<u64>,
    },
}

fn main() {
    let paths = StoragePaths::default();
    let _logging_guard = logging::init(&paths);
    let cli = Cli::parse();

    if let Err(err) = run(cli, &paths) {
        tracing::error!(error = %err, "kerb command failed");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, paths: &StoragePaths) -> Result<(), String> {
    paths
        .ensure_dirs()
        .map_err(|err| format!("Failed to create data directory: {}", err))?;
    let config = BillingConfig::load(&paths.config_file())?;

    let file_store = Arc::new(FileStore::load(&paths.state_file()));
    let mut store = SessionStore::with_state(
        Arc::new(SystemClock),
        file_store.account(),
        file_store.session(),
    );
    store.add_sink(file_store);

    match cli.command {
        Commands::Start {
            plate,
            location,
            rate,
            hours,
        } => {
            let session = store.start(StartRequest {
                plate,
                location,
                hourly_rate: rate.unwrap_or(config.default_hourly_rate),
                limit_hours: hours.unwrap_or(config.default_limit_hours),
            })?;
            println!(
                "Started parking for {} at {}",
                session.plate, session.location
            );
            println!(
                "Rate {} {}/h, paid until {}",
                format_money(&session.hourly_rate),
                config.currency,
                format_timestamp(session.expires_at())
            );
            Ok(())
        }
        Commands::Extend { hours } => {
            let session = store.extend(hours)?;
            println!(
                "Extended by {}h; paid until {}",
                hours,
                format_timestamp(session.expires_at())
            );
            Ok(())
        }
        Commands::Refresh => {
            let result = store.recalculate_and_debit()?;
            if result.delta.is_zero() {
                println!(
                    "Nothing new to settle; balance {} {}",
                    format_money(&result.balance),
                    config.currency
                );
            } else {
                println!(
                    "Settled {} {}; balance {} {}",
                    format_money(&result.delta),
                    config.currency,
                    format_money(&result.balance),
                    config.currency
                );
            }
            Ok(())
        }
        Commands::Finalize => {
            let result = store.finalize()?;
            println!(
                "Session closed: {} {} for {} parked",
                format_money(&result.total_cost),
                config.currency,
                format_hms((result.ended_at - result.session.started_at).num_seconds())
            );
            println!(
                "Balance {} {}",
                format_money(&result.balance),
                config.currency
            );
            Ok(())
        }
        Commands::Credit { amount } => {
            let movement = store.credit_balance(amount)?;
            println!(
                "Recharged {} {}; balance {} {}",
                format_money(&movement.amount),
                config.currency,
                format_money(&store.balance()),
                config.currency
            );
            Ok(())
        }
        Commands::Status => {
            print_status(&store, &config);
            Ok(())
        }
        Commands::Audit => {
            let audit = store.audit_balance();
            if audit.is_consistent() {
                println!(
                    "Ledger consistent: {} movements replay to {} {}",
                    store.movement_count(),
                    format_money(&audit.replayed),
                    config.currency
                );
                Ok(())
            } else {
                Err(format!(
                    "Ledger mismatch: live balance {} but movements replay to {}",
                    format_money(&audit.live),
                    format_money(&audit.replayed)
                ))
            }
        }
        Commands::Watch { settle_every } => watch::run(
            Arc::new(store),
            config.tick_interval(),
            &config.currency,
            settle_every,
        ),
    }
}

fn print_status(store: &SessionStore, config: &BillingConfig) {
    println!(
        "Balance: {} {}",
        format_money(&store.balance()),
        config.currency
    );

    match store.active_session() {
        Some(session) => {
            let snapshot = project(&session, store.clock().now());
            println!("Active session: {} at {}", session.plate, session.location);
            println!("  Started:  {}", format_timestamp(session.started_at));
            println!(
                "  Elapsed:  {} ({} {} running)",
                format_hms(snapshot.elapsed_secs),
                format_money(&snapshot.display_cost),
                config.currency
            );
            if snapshot.limit_reached {
                println!("  Remaining: time is up");
            } else {
                println!("  Remaining: {}", format_hms(snapshot.remaining_secs));
            }
            println!(
                "  Settled:  {} {} of {} {}/h, limit {}h",
                format_money(&session.accrued_cost),
                config.currency,
                format_money(&session.hourly_rate),
                config.currency,
                session.limit_hours
            );
        }
        None => println!("No active parking session"),
    }

    let movements = store.movements();
    if !movements.is_empty() {
        println!("Recent movements:");
        for movement in movements.iter().rev().take(STATUS_MOVEMENT_LINES) {
            println!("  {}", format_movement_line(movement));
        }
    }
}
