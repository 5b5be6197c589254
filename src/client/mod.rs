//! Remote generation client boundary.

mod gemini;

pub use gemini::{GeminiClient, GeminiClientBuilder, GeminiImageModel};

use crate::error::Result;
use crate::image::EmbeddedImage;
use async_trait::async_trait;

/// The image payload returned by a successful edit call.
///
/// The service returns the base64 data and the media type as separate
/// fields; [`EditedImage::into_embedded`] recombines them into the
/// self-describing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    /// Base64 image payload, no data-URI prefix.
    pub data: String,
    /// MIME type of the payload (e.g. `image/png`).
    pub media_type: String,
}

impl EditedImage {
    /// Recombines the payload and media type into an [`EmbeddedImage`].
    pub fn into_embedded(self) -> EmbeddedImage {
        EmbeddedImage::from_raw_parts(self.media_type, self.data)
    }
}

/// Trait for generative AI clients.
///
/// Both operations are single-shot remote calls: no retry, no timeout
/// override, no caching. Any transport or service-side failure surfaces
/// as a typed error to the caller.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Edits the reference image according to one prompt.
    ///
    /// Returns [`crate::MultiGenError::NoImage`] when the service responds
    /// successfully but without a usable image, distinct from transport
    /// failures.
    async fn edit_image(&self, reference: &EmbeddedImage, prompt: &str) -> Result<EditedImage>;

    /// Expands a natural-language description into a list of candidate
    /// prompts, one per line of the model's response.
    async fn expand_prompts(&self, description: &str) -> Result<Vec<String>>;
}
