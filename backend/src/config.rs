//! Runtime configuration from environment variables.
//!
//! `.env` is loaded by the binary before [`AppConfig::from_env`] runs.
//!
//! | Variable                | Default               |
//! |-------------------------|-----------------------|
//! | `KPILENS_PORT`          | `3000`                |
//! | `KPILENS_STORE_DIR`     | `.kpilens/dashboards` |
//! | `KPILENS_NUMBER_SYSTEM` | `indian`              |
//! | `KPILENS_DECIMALS`      | `2`                   |
//! | `KPILENS_CURRENCY`      | unset                 |
//! | `KPILENS_STRICT`        | `false`               |

use std::env;
use std::path::PathBuf;

use crate::format::{FormatOptions, NumberSystem, MAX_DECIMALS};
use crate::store::DEFAULT_STORE_DIR;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub store_dir: PathBuf,
    pub number_system: NumberSystem,
    pub decimals: u32,
    pub currency: Option<String>,
    /// Default for strict row checking on upload.
    pub strict: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            number_system: NumberSystem::default(),
            decimals: 2,
            currency: None,
            strict: false,
        }
    }
}

impl AppConfig {
    /// Read the process environment. Unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            port: get("KPILENS_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            store_dir: get("KPILENS_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            number_system: get("KPILENS_NUMBER_SYSTEM")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.number_system),
            decimals: get("KPILENS_DECIMALS")
                .and_then(|v| v.parse().ok())
                .filter(|d| *d <= MAX_DECIMALS)
                .unwrap_or(defaults.decimals),
            currency: get("KPILENS_CURRENCY"),
            strict: get("KPILENS_STRICT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.strict),
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            system: self.number_system,
            decimals: self.decimals,
            currency_symbol: self.currency.clone(),
            compact: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("KPILENS_PORT", "8080"),
            ("KPILENS_NUMBER_SYSTEM", "international"),
            ("KPILENS_DECIMALS", "1"),
            ("KPILENS_CURRENCY", "$"),
            ("KPILENS_STRICT", "yes"),
            ("KPILENS_STORE_DIR", "/tmp/dash"),
        ]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.number_system, NumberSystem::International);
        assert!(cfg.strict);
        assert_eq!(cfg.store_dir, PathBuf::from("/tmp/dash"));

        let opts = cfg.format_options();
        assert_eq!(opts.decimals, 1);
        assert_eq!(opts.currency_symbol.as_deref(), Some("$"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = config(&[
            ("KPILENS_PORT", "not-a-port"),
            ("KPILENS_NUMBER_SYSTEM", "roman"),
            ("KPILENS_DECIMALS", "99"),
            ("KPILENS_CURRENCY", "  "),
        ]);
        assert_eq!(cfg, AppConfig::default());
    }
}
