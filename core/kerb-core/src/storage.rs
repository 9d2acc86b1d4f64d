//! Storage paths and the file-backed state sink.
//!
//! On-disk state is one versioned JSON file holding the account and the
//! active session, if any:
//!
//! ```json
//! {
//!   "version": 1,
//!   "account": { "balance": "80", "movements": [ ... ] },
//!   "session": { ... ParkingSession fields ... } | null
//! }
//! ```
//!
//! Loads are defensive: a missing, empty, corrupt, or version-mismatched file
//! yields a fresh default state with a warning rather than an error. Writes
//! go through a temp file in the same directory and an atomic rename, so a
//! crash mid-write never leaves a torn file behind.
//!
//! A settlement reaches the sink as several notifications, each rewriting
//! the file, so a crash between them persists a prefix of the sequence. The
//! store emits the session snapshot before the movement and the balance; a
//! prefix at worst drops the newest debit, and resuming never charges the
//! settled interval again. `kerb audit` flags the ledger/balance mismatch a
//! dropped tail can leave.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::ledger::{Account, Movement};
use crate::session::ParkingSession;
use crate::sink::StateSink;

pub const STATE_FILE_VERSION: u32 = 1;

/// Central configuration for all Kerb storage paths.
///
/// Production code uses `StoragePaths::default()` which points to `~/.kerb/`.
/// Tests use `StoragePaths::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        let home = dirs::home_dir().expect("Could not find home directory");
        Self {
            root: home.join(".kerb"),
        }
    }
}

impl StoragePaths {
    /// Creates a StoragePaths with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to state.json (account balance, ledger, active session).
    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Path to config.toml (billing defaults).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ (debug log files).
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

/// The on-disk JSON structure for the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateFile {
    /// Schema version. We only load files with the current version.
    version: u32,
    account: Account,
    session: Option<ParkingSession>,
}

/// State sink that mirrors every change into the state file.
///
/// Keeps its own copy of the persisted shape so each notification can be
/// folded in and the whole file rewritten atomically. Also the loader the
/// host uses to seed a `SessionStore` at startup.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StateFile>,
}

impl FileStore {
    /// Loads persisted state, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: Mutex::new(load_state_file(path)),
        }
    }

    pub fn account(&self) -> Account {
        self.lock_state().account.clone()
    }

    pub fn session(&self) -> Option<ParkingSession> {
        self.lock_state().session.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StateFile> {
        // Recover from poisoning - the mirror is rewritten on every change
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, state: &StateFile) -> Result<(), String> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        let parent_dir = self
            .path
            .parent()
            .ok_or_else(|| "State file path has no parent directory".to_string())?;
        fs::create_dir_all(parent_dir)
            .map_err(|e| format!("Failed to create state directory: {}", e))?;

        let mut temp_file =
            NamedTempFile::new_in(parent_dir).map_err(|e| format!("Temp file error: {}", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| format!("Failed to write temp state file: {}", e))?;
        temp_file
            .flush()
            .map_err(|e| format!("Failed to flush temp state file: {}", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| format!("Failed to write state file: {}", e.error))?;

        Ok(())
    }
}

impl StateSink for FileStore {
    fn session_changed(&self, session: Option<&ParkingSession>) -> Result<(), String> {
        let mut state = self.lock_state();
        state.session = session.cloned();
        self.save(&state)
    }

    fn balance_changed(&self, balance: rust_decimal::Decimal) -> Result<(), String> {
        let mut state = self.lock_state();
        state.account.balance = balance;
        self.save(&state)
    }

    fn movement_appended(&self, movement: &Movement) -> Result<(), String> {
        let mut state = self.lock_state();
        state.account.movements.push(movement.clone());
        self.save(&state)
    }
}

fn load_state_file(path: &Path) -> StateFile {
    let empty = StateFile {
        version: STATE_FILE_VERSION,
        ..StateFile::default()
    };

    if !path.exists() {
        return empty;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(error = %err, "Failed to read state file; starting empty");
            return empty;
        }
    };

    if content.trim().is_empty() {
        warn!(path = %path.display(), "Empty state file; starting empty");
        return empty;
    }

    match serde_json::from_str::<StateFile>(&content) {
        Ok(state) if state.version == STATE_FILE_VERSION => state,
        Ok(state) => {
            warn!(
                version = state.version,
                expected = STATE_FILE_VERSION,
                "Unsupported state file version; starting empty"
            );
            empty
        }
        Err(err) => {
            warn!(error = %err, "Failed to parse state file; starting empty");
            empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_default_root_is_kerb() {
        let paths = StoragePaths::default();
        assert!(paths.root().ends_with(".kerb"));
    }

    #[test]
    fn test_file_paths_hang_off_the_root() {
        let paths = StoragePaths::with_root(PathBuf::from("/tmp/kerb-test"));
        assert_eq!(paths.state_file(), PathBuf::from("/tmp/kerb-test/state.json"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/kerb-test/config.toml")
        );
        assert_eq!(paths.log_dir(), PathBuf::from("/tmp/kerb-test/logs"));
    }

    #[test]
    fn test_ensure_dirs_creates_structure() {
        let temp = tempdir().unwrap();
        let paths = StoragePaths::with_root(temp.path().join("kerb"));

        paths.ensure_dirs().unwrap();

        assert!(paths.root().exists());
        assert!(paths.log_dir().exists());
    }

    #[test]
    fn test_load_nonexistent_file_starts_empty() {
        let temp = tempdir().unwrap();
        let store = FileStore::load(&temp.path().join("missing.json"));

        assert_eq!(store.account(), Account::default());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_load_empty_file_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("empty.json");
        std::fs::write(&file, "").unwrap();

        let store = FileStore::load(&file);
        assert_eq!(store.account(), Account::default());
    }

    #[test]
    fn test_load_corrupt_json_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("corrupt.json");
        std::fs::write(&file, "{invalid json}").unwrap();

        let store = FileStore::load(&file);
        assert_eq!(store.account(), Account::default());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_load_unsupported_version_starts_empty() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("future.json");
        std::fs::write(
            &file,
            r#"{"version":99,"account":{"balance":"10","movements":[]},"session":null}"#,
        )
        .unwrap();

        let store = FileStore::load(&file);
        assert_eq!(store.account(), Account::default());
    }

    #[test]
    fn test_sink_notifications_round_trip_through_the_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("state.json");

        let mut account = Account::default();
        let movement = account.record_credit(dec!(50), now());
        let session = ParkingSession {
            id: "01JSTORE000000000000000000".to_string(),
            plate: "ABC123".to_string(),
            location: "Lot 7".to_string(),
            started_at: now(),
            hourly_rate: dec!(120),
            limit_hours: dec!(2),
            accrued_cost: dec!(0),
        };

        {
            let store = FileStore::load(&file);
            store.movement_appended(&movement).unwrap();
            store.balance_changed(account.balance).unwrap();
            store.session_changed(Some(&session)).unwrap();
        }

        let reloaded = FileStore::load(&file);
        assert_eq!(reloaded.account(), account);
        assert_eq!(reloaded.session(), Some(session));
    }

    #[test]
    fn test_session_cleared_on_none() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("state.json");
        let session = ParkingSession {
            id: "01JSTORE000000000000000000".to_string(),
            plate: "ABC123".to_string(),
            location: "Lot 7".to_string(),
            started_at: now(),
            hourly_rate: dec!(120),
            limit_hours: dec!(2),
            accrued_cost: dec!(0),
        };

        let store = FileStore::load(&file);
        store.session_changed(Some(&session)).unwrap();
        store.session_changed(None).unwrap();

        let reloaded = FileStore::load(&file);
        assert!(reloaded.session().is_none());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("nested").join("state.json");

        let store = FileStore::load(&file);
        store.balance_changed(dec!(10)).unwrap();

        assert!(file.exists());
    }
}
