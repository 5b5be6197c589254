#![warn(missing_docs)]
//! MultiGen - batch image editing with generative AI.
//!
//! One reference image, many prompts: each prompt drives one remote edit
//! call, strictly in order, and results stream into a gallery as they
//! arrive. A failed prompt never stops the ones after it. A second
//! operation expands a natural-language description into a prompt list.
//!
//! # Quick Start
//!
//! ```no_run
//! use multigen::{BatchController, EmbeddedImage, GeminiClient, PromptList, MAX_PROMPTS};
//!
//! #[tokio::main]
//! async fn main() -> multigen::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let reference = EmbeddedImage::from_path("reference.png")?;
//!     let prompts = PromptList::parse("a cat\na dog\nan owl", MAX_PROMPTS)?;
//!
//!     let mut batch = BatchController::new();
//!     let summary = batch
//!         .run(&client, &reference, &prompts, &|event: multigen::BatchEvent| {
//!             if let multigen::BatchEvent::ItemCompleted { item } = event {
//!                 println!("done: {}", item.source_prompt);
//!             }
//!         })
//!         .await;
//!
//!     println!("{} generated, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
mod error;
pub mod image;
pub mod prompts;
pub mod session;
pub mod suggest;

// Re-export error types at crate root
pub use error::{MultiGenError, Result};

// Re-export commonly used types
pub use batch::{
    BatchController, BatchEvent, BatchFailure, BatchProgress, BatchRunState, BatchSummary,
    CancelFlag, GeneratedItem, ProgressSink,
};
pub use client::{
    EditedImage, GeminiClient, GeminiClientBuilder, GeminiImageModel, GenerationClient,
};
pub use image::{EmbeddedImage, ImageFormat};
pub use prompts::{normalize_lines, PromptList, MAX_PROMPTS};
pub use session::{Screen, Session, SplashTimer, SPLASH_DURATION};
pub use suggest::SuggestionController;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::batch::{BatchController, BatchEvent, BatchProgress, ProgressSink};
    pub use crate::client::{GeminiClient, GenerationClient};
    pub use crate::error::{MultiGenError, Result};
    pub use crate::image::EmbeddedImage;
    pub use crate::prompts::{PromptList, MAX_PROMPTS};
    pub use crate::suggest::SuggestionController;
}
