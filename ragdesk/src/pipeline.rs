//! End-to-end answer pipeline
//!
//! question -> retrieval (cached) -> context -> generation -> handoff decision.
//! Every failure along the way is folded into the response metadata; callers
//! always receive a well-formed [`AgentResponse`].

use chrono::Utc;
use ragdesk_cache::CacheManager;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::context::{BuiltContext, ContextBuilder};
use crate::decision::{EvidenceFlags, GroundingResult, HandoffDecision, HandoffPolicy, Route};
use crate::error::ProviderError;
use crate::generation::{
    build_prompt, generate_with_retry, insufficient_information, GenerationProvider,
};
use crate::retrieval::{
    ProviderKind, ProviderRegistry, RetrievalOrchestrator, RetrievalOutcome,
};

/// One customer question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub message: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AnswerRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Knowledge,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Knowledge => write!(f, "knowledge"),
        }
    }
}

/// What the surrounding system receives for every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub answer: String,
    pub agent: AgentKind,
    pub route: Route,
    pub grounding: GroundingResult,
    pub meta: Map<String, Value>,
}

impl AgentResponse {
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

/// Wires cache, orchestrator, context builder, generator and handoff policy
pub struct AnswerPipeline {
    config: PipelineConfig,
    cache: Arc<CacheManager>,
    orchestrator: RetrievalOrchestrator,
    builder: ContextBuilder,
    policy: HandoffPolicy,
    generator: Arc<dyn GenerationProvider>,
}

impl AnswerPipeline {
    pub fn new(
        config: PipelineConfig,
        cache: Arc<CacheManager>,
        registry: ProviderRegistry,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        let orchestrator = RetrievalOrchestrator::new(config.retrieval.clone(), cache.clone(), registry);
        let builder = ContextBuilder::new(config.context.clone());
        let policy = HandoffPolicy::new(&config.decision);

        info!(
            "AnswerPipeline initialized: generator={}, max_context_chars={}, threshold={}",
            generator.name(),
            config.context.max_context_chars,
            config.decision.handoff_confidence_threshold
        );

        Self {
            config,
            cache,
            orchestrator,
            builder,
            policy,
            generator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &RetrievalOrchestrator {
        &self.orchestrator
    }

    /// Construct every registered provider ahead of the first request
    pub fn warm_up(&self) -> usize {
        self.orchestrator.registry().warm_up()
    }

    /// Answer one question. Never panics and never returns an error.
    pub async fn answer(&self, request: &AnswerRequest) -> AgentResponse {
        let total_start = Instant::now();
        let locale = request.locale.as_deref();
        let question = request.message.trim();

        let mut meta = Map::new();
        meta.insert("request_id".into(), json!(Uuid::new_v4().to_string()));
        meta.insert("received_at".into(), json!(Utc::now().to_rfc3339()));
        if let Some(ref user_id) = request.user_id {
            meta.insert("user_id".into(), json!(user_id));
        }

        if question.is_empty() {
            meta.insert("error".into(), json!("empty_question"));
            return AgentResponse {
                answer: "No question provided".to_string(),
                agent: AgentKind::Knowledge,
                route: Route::Escalate,
                grounding: GroundingResult::empty(),
                meta,
            };
        }

        // Retrieval
        let kinds = self.orchestrator.registry().kinds();
        let outcome = self.orchestrator.orchestrate(question, &kinds).await;
        meta.insert("retrieval_ms".into(), json!(outcome.elapsed_ms));
        record_retrieval(&mut meta, &outcome);

        // Context
        let context_start = Instant::now();
        let built = self.builder.build(
            question,
            outcome.items(ProviderKind::SemanticVector),
            outcome.items(ProviderKind::Faq),
        );
        meta.insert("context_ms".into(), json!(elapsed_ms(context_start)));
        meta.insert(
            "context".into(),
            serde_json::to_value(&built.metadata).unwrap_or_default(),
        );

        if built.is_empty() {
            warn!("No usable evidence for question, escalating");
            meta.insert("fallback_reason".into(), json!("no_context"));
            meta.insert("confidence".into(), json!(0.0));
            meta.insert("decision".into(), json!(Route::Escalate));
            meta.insert("total_ms".into(), json!(elapsed_ms(total_start)));
            return AgentResponse {
                answer: insufficient_information(locale),
                agent: AgentKind::Knowledge,
                route: Route::Escalate,
                grounding: GroundingResult::empty(),
                meta,
            };
        }

        let evidence = EvidenceFlags::from_categories(built.contributing());

        // Generation
        let generation_start = Instant::now();
        let prompt = build_prompt(locale, question, &built.context);
        meta.insert("prompt_chars".into(), json!(prompt.chars().count()));
        let generated = self.generate(&prompt, &mut meta).await;
        meta.insert("generation_ms".into(), json!(elapsed_ms(generation_start)));

        // Decision
        let (answer, decision) = match generated {
            Some(answer) => {
                let decision = self.policy.decide(&answer, &evidence, &built.metadata.source_urls);
                (decision.finalize_answer(&answer), decision)
            }
            None => {
                // Nothing to scan for scope; route on evidence alone
                let decision = self.policy.decide("", &evidence, &[]);
                (insufficient_information(locale), decision)
            }
        };

        record_decision(&mut meta, &decision, &built);
        meta.insert("total_ms".into(), json!(elapsed_ms(total_start)));

        AgentResponse {
            answer,
            agent: AgentKind::Knowledge,
            route: decision.route,
            grounding: decision.grounding(),
            meta,
        }
    }

    /// Response cache first, then the generator under the generation deadline.
    /// `None` means no usable answer was produced.
    async fn generate(&self, prompt: &str, meta: &mut Map<String, Value>) -> Option<String> {
        let settings = &self.config.generation;

        if settings.cache_responses {
            if let Some(answer) = self.cache.get_response(prompt) {
                debug!("Response cache hit");
                meta.insert("response_cache_hit".into(), json!(true));
                meta.insert("generation_calls".into(), json!(0));
                return Some(answer);
            }
        }
        meta.insert("response_cache_hit".into(), json!(false));

        // The generator runs on its own task so a hang is bounded and a panic
        // stays contained
        let timeout = settings.timeout();
        let generator = self.generator.clone();
        let owned_prompt = prompt.to_string();
        let owned_settings = settings.clone();
        let mut call = tokio::spawn(async move {
            generate_with_retry(generator.as_ref(), &owned_prompt, &owned_settings).await
        });

        let result = match tokio::time::timeout(timeout, &mut call).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ProviderError::Backend(if e.is_panic() {
                format!("{} generator panicked", self.generator.name())
            } else {
                format!("{} generator call was cancelled", self.generator.name())
            })),
            Err(_) => {
                call.abort();
                Err(ProviderError::Timeout {
                    provider: self.generator.name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        match result {
            Ok(generated) if !generated.answer.trim().is_empty() => {
                meta.insert("generation_calls".into(), json!(generated.calls));
                if settings.cache_responses
                    && generated.answer.trim().chars().count() >= settings.min_answer_length
                {
                    self.cache.set_response(prompt, generated.answer.clone());
                }
                Some(generated.answer)
            }
            Ok(generated) => {
                warn!("{} returned an empty answer", self.generator.name());
                meta.insert("generation_calls".into(), json!(generated.calls));
                meta.insert("error".into(), json!("generation_failed"));
                meta.insert("error_detail".into(), json!("empty answer"));
                None
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                meta.insert("error".into(), json!("generation_failed"));
                meta.insert("error_detail".into(), json!(e.to_string()));
                None
            }
        }
    }
}

fn record_retrieval(meta: &mut Map<String, Value>, outcome: &RetrievalOutcome) {
    meta.insert("strategy".into(), json!(outcome.strategy.to_string()));
    meta.insert("complexity".into(), json!(outcome.complexity));

    for result in &outcome.results {
        let name = result.provider().as_str();
        meta.insert(format!("{}_ms", name), json!(result.latency_ms()));
        meta.insert(format!("{}_connect_ms", name), json!(result.connect_latency_ms()));
        meta.insert(format!("{}_items", name), json!(result.items().len()));
        meta.insert(format!("{}_cache_hit", name), json!(result.cache_hit()));
        meta.insert(
            format!("{}_error", name),
            result
                .error()
                .map(|e| json!(e.kind.as_str()))
                .unwrap_or(Value::Null),
        );
    }
}

fn record_decision(meta: &mut Map<String, Value>, decision: &HandoffDecision, built: &BuiltContext) {
    meta.insert("confidence".into(), json!(decision.confidence));
    meta.insert("threshold".into(), json!(decision.threshold));
    meta.insert("decision".into(), json!(decision.route));
    meta.insert("oos".into(), json!(decision.out_of_scope));
    meta.insert("sources_attached".into(), json!(decision.sources_attached));
    meta.insert(
        "evidence".into(),
        json!(built
            .contributing()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()),
    );
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
