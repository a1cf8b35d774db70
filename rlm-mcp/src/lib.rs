//! Agent-facing JSON-RPC-over-stdio tool surface for the episodic memory
//! engine (spec.md §6.3): a hand-rolled `serde_json::Value` dispatch over
//! `initialize`/`tools/list`/`tools/call`/`shutdown`, exposing exactly the
//! six tools `recall`, `remember`, `memory_list`, `memory_extract`,
//! `remember_url`, `forget`, each mapping one-to-one onto a `rlm-cli` verb.
//!
//! Kept deliberately small: this crate talks to `rlm-core`/
//! `rlm-storage-sqlite` directly rather than shelling out to the `rlm`
//! binary, and (unlike `rlm-cli`) never runs concurrently with itself —
//! one process, one stdio loop, one thread-local store connection.

use rlm_core::config::EngineConfig;
use rlm_core::oracle::{
    FactOracleSet, FallbackFactOracle, FallbackTagOracle, HeuristicSummaryOracle, ProcessFactOracle,
    ProcessSummaryOracle, ProcessTagOracle, SummaryOracleSet, TagOracleSet,
};
use rlm_core::store::Store;
use rlm_storage_sqlite::SqliteStore;

pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod tools;

pub use error::{Error, Result};

/// Everything a tool call needs: the store, engine config, and the three
/// oracle sets (each LM-backed primary with a deterministic fallback, per
/// `rlm_core::oracle`).
pub struct McpContext {
    pub store: Box<dyn Store>,
    pub cfg: EngineConfig,
    pub tag_oracle: TagOracleSet,
    pub summary_oracle: SummaryOracleSet,
    pub fact_oracle: FactOracleSet,
}

impl McpContext {
    /// Build a context from an `EngineConfig`, opening (or creating) its
    /// SQLite store. Mirrors `rlm-cli`'s `build_oracles`.
    #[must_use]
    pub fn new(cfg: EngineConfig) -> Self {
        let store = Box::new(SqliteStore::new(cfg.db_path.clone()));
        let tag_oracle = TagOracleSet::new(
            Box::new(ProcessTagOracle { command: cfg.oracle_command.clone(), timeout: cfg.oracle_timeout }),
            Box::new(FallbackTagOracle),
        );
        let summary_oracle = SummaryOracleSet::new(
            Box::new(ProcessSummaryOracle {
                command: cfg.oracle_command.clone(),
                timeout: cfg.oracle_timeout,
            }),
            Box::new(HeuristicSummaryOracle),
        );
        let fact_oracle = FactOracleSet::new(
            Box::new(ProcessFactOracle {
                command: cfg.oracle_command.clone(),
                timeout: cfg.fact_oracle_timeout,
            }),
            Box::new(FallbackFactOracle),
        );
        Self { store, cfg, tag_oracle, summary_oracle, fact_oracle }
    }

    /// Read `RLM_DB_PATH`/`RLM_ORACLE_CMD` the same way `rlm-cli` does.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EngineConfig::from_env())
    }
}

#[cfg(test)]
impl McpContext {
    /// A context backed by a throwaway temp-directory store, for tests.
    /// Leaks the `TempDir` guard deliberately: each test gets its own
    /// process-lifetime scratch database.
    pub(crate) fn for_test() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for test store");
        let db_path = dir.path().join("memory.db");
        std::mem::forget(dir);
        let mut cfg = EngineConfig::default();
        cfg.db_path = db_path;
        Self::new(cfg)
    }
}
