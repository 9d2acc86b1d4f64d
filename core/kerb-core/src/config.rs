//! Billing defaults loaded from `~/.kerb/config.toml`.
//!
//! Decimal fields are written as quoted strings to keep them exact:
//!
//! ```toml
//! default_hourly_rate = "2.40"
//! default_limit_hours = "2"
//! tick_interval_secs = 1
//! currency = "EUR"
//! ```

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BillingConfig {
    /// Hourly rate used when `start` is not given one.
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: Decimal,
    /// Paid-for window used when `start` is not given one.
    #[serde(default = "default_limit_hours")]
    pub default_limit_hours: Decimal,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Display label only; amounts carry no currency.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_hourly_rate: default_hourly_rate(),
            default_limit_hours: default_limit_hours(),
            tick_interval_secs: default_tick_interval_secs(),
            currency: default_currency(),
        }
    }
}

fn default_hourly_rate() -> Decimal {
    dec!(2.40)
}

fn default_limit_hours() -> Decimal {
    dec!(2)
}

fn default_tick_interval_secs() -> u64 {
    1
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl BillingConfig {
    /// Loads the config file, returning defaults when it does not exist.
    /// An unreadable or malformed file is an error rather than a silent
    /// default.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path)
            .map_err(|err| format!("Failed to read config {}: {}", path.display(), err))?;
        toml::from_str::<Self>(&content)
            .map_err(|err| format!("Failed to parse config {}: {}", path.display(), err))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = BillingConfig::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, BillingConfig::default());
    }

    #[test]
    fn test_full_file_parses() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_hourly_rate = "3.75"
default_limit_hours = "1.5"
tick_interval_secs = 2
currency = "CZK"
"#,
        )
        .unwrap();

        let config = BillingConfig::load(&path).unwrap();
        assert_eq!(config.default_hourly_rate, dec!(3.75));
        assert_eq!(config.default_limit_hours, dec!(1.5));
        assert_eq!(config.tick_interval_secs, 2);
        assert_eq!(config.currency, "CZK");
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "currency = \"NOK\"\n").unwrap();

        let config = BillingConfig::load(&path).unwrap();
        assert_eq!(config.currency, "NOK");
        assert_eq!(config.default_hourly_rate, dec!(2.40));
        assert_eq!(config.tick_interval_secs, 1);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "default_hourly_rate = [not toml").unwrap();

        assert!(BillingConfig::load(&path).is_err());
    }

    #[test]
    fn test_tick_interval_never_goes_below_one_second() {
        let config = BillingConfig {
            tick_interval_secs: 0,
            ..BillingConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }
}
