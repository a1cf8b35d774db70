//! Engine configuration.
//!
//! Replaces the upstream `rlm` Python modules' reliance on module-level
//! globals (`MEMORY_DIR`, `DB_PATH`) with an explicit value constructed
//! once at startup and threaded through the engine, per spec.md §9.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;

/// Configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Command used to invoke the external LM oracle (e.g. `claude`).
    pub oracle_command: String,
    /// Timeout for tag/summary oracle calls.
    pub oracle_timeout: Duration,
    /// Timeout for the (larger-prompt) fact oracle call.
    pub fact_oracle_timeout: Duration,
    /// Char threshold above which `smart_remember` writes two episodes.
    pub summary_threshold: usize,
    /// Char threshold above which a stored episode gets a chunk manifest.
    pub chunk_threshold: usize,
    /// Minimum confidence for a fact to be stored.
    pub min_confidence: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            oracle_command: "claude".to_string(),
            oracle_timeout: constants::DEFAULT_ORACLE_TIMEOUT,
            fact_oracle_timeout: constants::FACT_ORACLE_TIMEOUT,
            summary_threshold: constants::SUMMARY_THRESHOLD,
            chunk_threshold: constants::CHUNK_THRESHOLD,
            min_confidence: constants::MIN_CONFIDENCE,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables layered over
    /// defaults: `RLM_DB_PATH`, `RLM_ORACLE_CMD`. Read once at process
    /// startup; no hot-reload.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(path) = std::env::var("RLM_DB_PATH") {
            cfg.db_path = PathBuf::from(path);
        }
        if let Ok(cmd) = std::env::var("RLM_ORACLE_CMD") {
            cfg.oracle_command = cmd;
        }
        cfg
    }
}

/// `~/.rlm/memory/memory.db`, matching the upstream `MEMORY_DIR`/`DB_PATH`
/// layout (spec.md §6.4).
fn default_db_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".rlm").join("memory").join("memory.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_expected_thresholds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.summary_threshold, 4000);
        assert_eq!(cfg.chunk_threshold, 10_000);
        assert!((cfg.min_confidence - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn db_path_ends_in_memory_db() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.db_path.file_name().unwrap(), "memory.db");
    }
}
