//! Retrieval module
//!
//! Fans a question out to the configured evidence providers with
//! per-provider timeouts, caching successful results for a short window.

pub mod orchestrator;
pub mod provider;
pub mod types;

pub use orchestrator::{
    analyze_complexity, OrchestratorStats, RetrievalConfig, RetrievalOrchestrator,
    RETRIEVAL_NAMESPACE,
};
pub use provider::{ProviderFactory, ProviderHandle, ProviderRegistry, RetrievalProvider};
pub use types::{
    EvidenceCategory, ExecutionStrategy, ProviderKind, RetrievalOutcome, RetrievalResult,
    RetrievedItem,
};
