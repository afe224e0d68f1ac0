use async_trait::async_trait;

use super::GenerationProvider;
use crate::error::ProviderError;

const CONTEXT_MARKER: &str = "\nContext:\n";

/// Offline generator that answers with the first context section of the
/// prompt, without its `[HEADER]` line.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self
    }

    fn extract(prompt: &str) -> Option<&str> {
        let start = prompt.find(CONTEXT_MARKER)? + CONTEXT_MARKER.len();
        let context = &prompt[start..];

        let block = context.split("\n\n").next()?.trim();
        let body = match block.split_once('\n') {
            Some((header, rest)) if header.starts_with('[') && header.ends_with(']') => rest.trim(),
            _ => block,
        };

        (!body.is_empty()).then_some(body)
    }
}

#[async_trait]
impl GenerationProvider for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        Ok(Self::extract(prompt).unwrap_or_default().to_string())
    }
}
