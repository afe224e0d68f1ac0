//! Out-of-scope detection on generated answers

/// Phrases a generator uses when it cannot answer, in English and Portuguese
pub fn default_out_of_scope_phrases() -> Vec<String> {
    [
        "i don't know",
        "i do not know",
        "não tenho informações",
        "não sei",
        "fora do escopo",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeVerdict {
    InScope,
    OutOfScope { phrase: String },
}

impl ScopeVerdict {
    pub fn is_out_of_scope(&self) -> bool {
        matches!(self, ScopeVerdict::OutOfScope { .. })
    }
}

/// Case-insensitive substring match against known "I don't know" phrases
#[derive(Debug, Clone)]
pub struct OutOfScopeDetector {
    phrases: Vec<String>,
}

impl OutOfScopeDetector {
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// An empty answer gives no signal and counts as in scope
    pub fn detect(&self, answer: &str) -> ScopeVerdict {
        if answer.trim().is_empty() {
            return ScopeVerdict::InScope;
        }

        // Generators often use a typographic apostrophe
        let answer = answer.to_lowercase().replace('\u{2019}', "'");
        match self.phrases.iter().find(|p| answer.contains(p.as_str())) {
            Some(phrase) => ScopeVerdict::OutOfScope {
                phrase: phrase.clone(),
            },
            None => ScopeVerdict::InScope,
        }
    }
}

impl Default for OutOfScopeDetector {
    fn default() -> Self {
        Self::new(default_out_of_scope_phrases())
    }
}
