#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]

//! # rlm-core
//!
//! Storage-agnostic domain logic for a local-first episodic memory store
//! for coding-agent sessions.
//!
//! ## Core concepts
//!
//! - [`types::Episode`]: a stored memory entry — a chunk of conversation,
//!   file content, or archived session transcript.
//! - [`types::Fact`]: an atomic, entity-keyed claim extracted from an
//!   episode, superseded rather than duplicated as understanding changes.
//! - [`store::Store`]: the persistence seam a concrete backend
//!   (`rlm-storage-sqlite`) implements.
//! - [`oracle`]: capability traits (tag/summary/fact extraction), each
//!   backed by an external LM subprocess with a deterministic fallback.
//! - [`normalizer`]: reduces raw coding-agent transcripts (in either of
//!   two JSONL schemas) to a compact, common format before ingestion.
//! - [`pipeline::smart_remember`]: the single ingestion entry point every
//!   write path funnels through.
//! - [`archive`]: at-most-once archival of session transcripts, driven by
//!   hook events.
//! - [`query`]: bounded read-side operations (recall, list, extract,
//!   stats) for presenting store contents back to an agent.
//!
//! ## Quick start
//!
//! ```no_run
//! use rlm_core::config::EngineConfig;
//! use rlm_core::oracle::{
//!     FactOracleSet, FallbackFactOracle, FallbackSummaryOracle, FallbackTagOracle,
//!     SummaryOracleSet, TagOracleSet,
//! };
//! use rlm_core::pipeline::{smart_remember, RememberRequest};
//! use rlm_core::store::Store;
//!
//! fn remember_one(store: &dyn Store, cfg: &EngineConfig) -> rlm_core::error::Result<()> {
//!     let tag_oracle = TagOracleSet::new(Box::new(FallbackTagOracle), Box::new(FallbackTagOracle));
//!     let summary_oracle =
//!         SummaryOracleSet::new(Box::new(FallbackSummaryOracle), Box::new(FallbackSummaryOracle));
//!     let fact_oracle = FactOracleSet::new(Box::new(FallbackFactOracle), Box::new(FallbackFactOracle));
//!
//!     smart_remember(
//!         store,
//!         cfg,
//!         &tag_oracle,
//!         &summary_oracle,
//!         &fact_oracle,
//!         RememberRequest {
//!             content: "decided to use sqlite for local storage".to_string(),
//!             source: "text".to_string(),
//!             source_name: None,
//!             user_tags: vec![],
//!             label: None,
//!             dedup: false,
//!         },
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod facts;
pub mod normalizer;
pub mod oracle;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use pipeline::{smart_remember, RememberRequest};
pub use store::{ListFilter, ScoredFact, Store};
pub use types::{
    Chunk, Episode, EpisodeMeta, Fact, FactType, RawFact, RememberOutcome, ScoredEpisode,
    SizeCategory, StoreStats,
};
