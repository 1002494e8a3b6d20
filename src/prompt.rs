//! Descriptive prompt text for background generation

use crate::types::ProjectContext;

const DEFAULT_SUBJECT: &str = "the product";
const DEFAULT_BACKGROUND: &str = "a clean, softly lit neutral studio backdrop";

/// Builds the text prompt sent with every inpaint/outpaint request
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Deterministic prompt for a listing photo
    ///
    /// The prompt always asks the model to leave the subject untouched, since
    /// only the background region is meant to change.
    #[must_use]
    pub fn build(context: &ProjectContext) -> String {
        let subject = context
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT);
        let background = context
            .background_style
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BACKGROUND);

        let mut prompt = format!(
            "Professional resale listing photo of {} on {}, natural soft shadows, \
             realistic lighting, high detail; keep the item exactly as it is",
            subject, background
        );
        for hint in context.hints.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
            prompt.push_str(", ");
            prompt.push_str(hint);
        }
        prompt
    }

    /// Prompt for extending the canvas around an already edited image
    #[must_use]
    pub fn build_extension(context: &ProjectContext) -> String {
        format!(
            "{}; seamlessly continue the existing background to the new edges",
            Self::build(context)
        )
    }
}
