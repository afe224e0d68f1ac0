//! Text generation contract and the one-shot retry policy

pub mod command;
pub mod extractive;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ProviderError;

pub use command::CommandGenerator;
pub use extractive::ExtractiveGenerator;

/// Anything that turns a prompt into answer text
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Answers shorter than this (trimmed) get one retry
    pub min_answer_length: usize,

    pub retry_instruction: String,

    /// Look up and store final prompts in the response cache
    pub cache_responses: bool,

    /// Deadline for the whole generation step, retry included
    pub timeout_secs: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_answer_length: 40,
            retry_instruction: "Please answer concisely but fully.".to_string(),
            cache_responses: true,
            timeout_secs: 30.0,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

/// Answer text plus how many generator calls it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub answer: String,
    pub calls: u32,
}

/// Generate once, and once more with the retry instruction appended if
/// the first answer is too short. The longer of the two answers wins.
///
/// A failing retry keeps the first answer; a failing first call is an error.
pub async fn generate_with_retry(
    generator: &dyn GenerationProvider,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<Generated, ProviderError> {
    let first = generator.generate(prompt).await?;
    if first.trim().chars().count() >= config.min_answer_length {
        return Ok(Generated {
            answer: first,
            calls: 1,
        });
    }

    debug!(
        "Answer from {} shorter than {} chars, retrying once",
        generator.name(),
        config.min_answer_length
    );

    let retry_prompt = format!("{}\n\n{}", prompt, config.retry_instruction);
    let answer = match generator.generate(&retry_prompt).await {
        Ok(retry) if retry.trim().chars().count() > first.trim().chars().count() => retry,
        Ok(_) => first,
        Err(e) => {
            warn!("Retry generation failed, keeping first answer: {}", e);
            first
        }
    };

    Ok(Generated { answer, calls: 2 })
}

fn is_portuguese(locale: Option<&str>) -> bool {
    locale
        .map(|l| l.trim().to_lowercase().starts_with("pt"))
        .unwrap_or(false)
}

/// Locale-aware instruction placed at the top of every prompt
pub fn system_instruction(locale: Option<&str>) -> String {
    if is_portuguese(locale) {
        "[pt-BR] Responda sempre em português (pt-BR) usando apenas o contexto fornecido. \
         Se o contexto for insuficiente, diga explicitamente que não sabe e sugira o suporte humano. \
         Cite as fontes ao final em 'Sources:'."
            .to_string()
    } else {
        "[en] Always answer in English using only the provided context. \
         If the context is insufficient, explicitly say you don't know and suggest human support. \
         Cite sources at the end under 'Sources:'."
            .to_string()
    }
}

pub fn build_prompt(locale: Option<&str>, question: &str, context: &str) -> String {
    format!(
        "{}\n\nQuestion: {}\n\nContext:\n{}",
        system_instruction(locale),
        question,
        context
    )
}

/// Fallback answer when no grounded answer can be produced
pub fn insufficient_information(locale: Option<&str>) -> String {
    if is_portuguese(locale) {
        "Não tenho informações suficientes para responder com segurança. \
         Posso encaminhar sua pergunta para o suporte humano."
            .to_string()
    } else {
        "There is insufficient information to answer this reliably. \
         I can forward your question to human support."
            .to_string()
    }
}
