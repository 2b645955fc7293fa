use thiserror::Error;

/// Why a prompt was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptRejection {
    /// Nothing left after trimming and removing control characters.
    #[error("Prompt is empty")]
    Empty,
    /// Longer than the configured limit.
    #[error("Prompt exceeds maximum length of {limit} characters")]
    TooLong { limit: usize },
}

/// Gate every prompt passes before it is appended to a transcript or sent
/// for inference.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    max_prompt_length: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(32_000)
    }
}

impl Sanitizer {
    /// Refuse prompts longer than `max_prompt_length` characters.
    pub fn new(max_prompt_length: usize) -> Self {
        Self { max_prompt_length }
    }

    /// Limit in characters, not bytes.
    pub fn max_prompt_length(&self) -> usize {
        self.max_prompt_length
    }

    /// The prompt with control characters removed (line breaks and tabs
    /// survive), or why it cannot be used.
    pub fn check(&self, prompt: &str) -> Result<String, PromptRejection> {
        if prompt.chars().count() > self.max_prompt_length {
            return Err(PromptRejection::TooLong {
                limit: self.max_prompt_length,
            });
        }
        let kept: String = prompt
            .chars()
            .filter(|c| matches!(c, '\n' | '\r' | '\t') || !c.is_control())
            .collect();
        if kept.trim().is_empty() {
            return Err(PromptRejection::Empty);
        }
        Ok(kept)
    }
}
