use picks_storage::StoreError;
use thiserror::Error;

/// Failures that end a pipeline run. Everything else (a dead source, an unparseable mention, a
/// single failed lookup) is absorbed by the stage that hit it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no source could be reached ({attempted} attempted)")]
    NoSourcesReachable { attempted: usize },
    #[error("pick store unreachable after {failures} failed lookups: {source}")]
    StoreUnreachable {
        failures: usize,
        #[source]
        source: StoreError,
    },
    #[error("writing {attempted} picks failed: {source}")]
    Persistence {
        attempted: usize,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoSourcesReachable { .. } => "no_sources_reachable",
            PipelineError::StoreUnreachable { .. } => "store_unreachable",
            PipelineError::Persistence { .. } => "persistence",
        }
    }
}
