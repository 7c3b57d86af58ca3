use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::blockchain::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, SealLimits};

pub const DEFAULT_LEDGER_PATH: &str = "blockchain.json";

/// Runtime settings, read from the environment (and `.env`, loaded by the
/// binary through `dotenvy`).
///
/// | variable                   | default           |
/// |----------------------------|-------------------|
/// | `LEDGER_PATH`              | `blockchain.json` |
/// | `LEDGER_DIFFICULTY`        | `2`               |
/// | `LEDGER_SEAL_TIMEOUT_SECS` | unbounded         |
/// | `LEDGER_MAX_ATTEMPTS`      | unbounded         |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ledger_path: PathBuf,
    pub difficulty: u32,
    pub seal_timeout: Option<Duration>,
    pub max_attempts: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            difficulty: DEFAULT_DIFFICULTY,
            seal_timeout: None,
            max_attempts: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger_path = lookup("LEDGER_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH));

        let difficulty = lookup("LEDGER_DIFFICULTY")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_DIFFICULTY);

        let seal_timeout = lookup("LEDGER_SEAL_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let max_attempts = lookup("LEDGER_MAX_ATTEMPTS").and_then(|v| v.trim().parse().ok());

        Self {
            ledger_path,
            difficulty,
            seal_timeout,
            max_attempts,
        }
        .sanitized()
    }

    /// Clamp values that would make proof-of-work unsatisfiable.
    pub fn sanitized(mut self) -> Self {
        if self.difficulty > MAX_DIFFICULTY {
            warn!(
                "CONFIG - difficulty {} exceeds {}, using {}",
                self.difficulty, MAX_DIFFICULTY, DEFAULT_DIFFICULTY
            );
            self.difficulty = DEFAULT_DIFFICULTY;
        }
        self
    }

    pub fn seal_limits(&self) -> SealLimits {
        SealLimits {
            cancel: None,
            timeout: self.seal_timeout,
            max_attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.ledger_path, PathBuf::from("blockchain.json"));
        assert_eq!(cfg.difficulty, 2);
    }

    #[test]
    fn reads_all_variables() {
        let cfg = Config::from_lookup(lookup(&[
            ("LEDGER_PATH", "/tmp/ledger.json"),
            ("LEDGER_DIFFICULTY", "4"),
            ("LEDGER_SEAL_TIMEOUT_SECS", "30"),
            ("LEDGER_MAX_ATTEMPTS", "1000000"),
        ]));
        assert_eq!(cfg.ledger_path, PathBuf::from("/tmp/ledger.json"));
        assert_eq!(cfg.difficulty, 4);
        assert_eq!(cfg.seal_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.max_attempts, Some(1_000_000));

        let limits = cfg.seal_limits();
        assert_eq!(limits.timeout, Some(Duration::from_secs(30)));
        assert_eq!(limits.max_attempts, Some(1_000_000));
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("LEDGER_DIFFICULTY", "lots"),
            ("LEDGER_SEAL_TIMEOUT_SECS", "-1"),
        ]));
        assert_eq!(cfg.difficulty, 2);
        assert_eq!(cfg.seal_timeout, None);

        let cfg = Config::from_lookup(lookup(&[("LEDGER_DIFFICULTY", "65")]));
        assert_eq!(cfg.difficulty, 2);
    }
}
