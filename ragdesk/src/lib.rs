pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod providers;
pub mod retrieval;

pub use config::{CacheSettings, PipelineConfig, TierSettings};
pub use context::{BuiltContext, ContextBuilder, ContextConfig, ContextMetadata};
pub use decision::{
    DecisionConfig, EvidenceFlags, GroundingMode, GroundingResult, HandoffDecision, HandoffPolicy,
    Route,
};
pub use error::{ConfigError, ProviderError, RetrievalError, RetrievalErrorKind};
pub use generation::{
    generate_with_retry, CommandGenerator, ExtractiveGenerator, GenerationConfig,
    GenerationProvider,
};
pub use pipeline::{AgentKind, AgentResponse, AnswerPipeline, AnswerRequest};
pub use providers::KeywordProvider;
pub use retrieval::{
    EvidenceCategory, ExecutionStrategy, ProviderKind, ProviderRegistry, RetrievalConfig,
    RetrievalOrchestrator, RetrievalOutcome, RetrievalProvider, RetrievalResult, RetrievedItem,
};
