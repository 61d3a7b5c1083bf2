//! Ingestion-to-consensus pipeline: filter, group, score, dedup and write the picks gathered by
//! the source adapters.

pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod scoring;
pub mod writer;

pub use config::{
    load_source_registry, open_store, ClustererKind, SourceRegistry, StoreBackend, SyncConfig,
};
pub use dedup::{DedupOutcome, Deduplicator};
pub use error::PipelineError;
pub use filter::{filter_candidates, parse_candidates, Candidate, FilterConfig};
pub use grouping::{BucketClusterer, Clusterer, GreedyClusterer};
pub use pipeline::{
    run_once_from_env, Pipeline, PipelineSettings, RunFailure, RunState, RunStats, RunSummary,
    SourceReport,
};
pub use report::write_run_report;
pub use scheduler::maybe_build_scheduler;
pub use scoring::{score_groups, ConsensusScorer};
pub use writer::PersistenceWriter;

pub const CRATE_NAME: &str = "picks-sync";
