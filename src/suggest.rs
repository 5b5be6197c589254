//! Prompt suggestion: expand a description into candidate prompts.

use crate::client::GenerationClient;
use crate::error::Result;

/// Holds the most recent accepted suggestion list.
///
/// Unlike the batch, a suggestion call is atomic: it either fully succeeds
/// and replaces the list, or fails and leaves it untouched. There are no
/// partial results.
#[derive(Debug, Default)]
pub struct SuggestionController {
    prompts: Vec<String>,
}

impl SuggestionController {
    /// Creates a controller with no suggestions.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current suggestion list, in model output order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Returns true when no suggestions have been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Renders the list one prompt per line, ready to paste into the
    /// prompt-entry text.
    pub fn joined(&self) -> String {
        self.prompts.join("\n")
    }

    /// Expands `description` into prompts via one remote call.
    ///
    /// A blank description is a no-op that keeps the current list. On
    /// failure the error propagates and the current list is unchanged;
    /// the caller surfaces a "try again" message.
    pub async fn create<C>(&mut self, client: &C, description: &str) -> Result<&[String]>
    where
        C: GenerationClient + ?Sized,
    {
        let description = description.trim();
        if description.is_empty() {
            return Ok(&self.prompts);
        }

        let prompts = client.expand_prompts(description).await?;
        self.prompts = prompts;
        Ok(&self.prompts)
    }
}
