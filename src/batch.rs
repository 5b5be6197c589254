//! Sequential batch generation: one reference image, many prompts.
//!
//! The controller drives one [`GenerationClient::edit_image`] call per
//! prompt, strictly in list order with a single call in flight at a time.
//! Results stream to observers as they arrive; a failed prompt is recorded
//! and never stops the prompts after it.

use crate::client::GenerationClient;
use crate::image::EmbeddedImage;
use crate::prompts::PromptList;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchRunState {
    /// No batch has started (or the last start was a validation no-op).
    #[default]
    Idle,
    /// Prompts are being processed.
    Running,
    /// Every prompt has been attempted, or the run hit a cancellation
    /// boundary.
    Finished,
}

/// Attempt counter for one batch; `completed` counts successes and
/// failures alike and only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    /// Prompts attempted so far.
    pub completed: usize,
    /// Prompts in this batch; fixed for the lifetime of the run.
    pub total: usize,
}

impl BatchProgress {
    /// Returns true once every prompt has been attempted.
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// One successfully generated image and the prompt that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedItem {
    /// Unique identifier; does not rely on the clock, so items created
    /// within the same millisecond still get distinct ids.
    pub id: String,
    /// The prompt text that produced this image.
    pub source_prompt: String,
    /// The generated image in self-describing form.
    pub image: EmbeddedImage,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl GeneratedItem {
    fn new(source_prompt: String, image: EmbeddedImage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_prompt,
            image,
            created_at: Utc::now(),
        }
    }

    /// Download file name for this item, e.g. `multiprompt-<id>.png`.
    pub fn file_name(&self) -> String {
        format!("multiprompt-{}.{}", self.id, self.image.extension())
    }
}

/// A prompt whose edit call failed, with the rendered error.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// The prompt that failed.
    pub prompt: String,
    /// Rendered error message.
    pub error: String,
}

/// Events published while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// The batch entered `Running`.
    Started {
        /// Initial progress, `completed` still zero.
        progress: BatchProgress,
    },
    /// One prompt produced an image; emitted immediately, not at the end.
    ItemCompleted {
        /// The newly appended item.
        item: GeneratedItem,
    },
    /// One prompt failed; the batch continues.
    ItemFailed {
        /// The prompt that failed.
        prompt: String,
        /// Rendered error message.
        error: String,
    },
    /// Progress advanced after an attempt, success or failure.
    Progress(BatchProgress),
    /// The batch entered `Finished`.
    Finished {
        /// Final progress snapshot.
        progress: BatchProgress,
        /// True when a cancellation boundary ended the run early.
        cancelled: bool,
    },
}

/// Observer for batch events.
pub trait ProgressSink: Send + Sync {
    /// Called for every event, in order, from the batch task.
    fn on_event(&self, event: BatchEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(BatchEvent) + Send + Sync,
{
    fn on_event(&self, event: BatchEvent) {
        self(event)
    }
}

/// Shared flag for cooperative cancellation.
///
/// Checked at the per-item boundary: the in-flight call is never
/// interrupted, but no further item starts once the flag is set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation at the next item boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Final accounting for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Prompts that produced an image.
    pub succeeded: usize,
    /// Prompts whose edit call failed.
    pub failed: usize,
    /// True when the run ended at a cancellation boundary.
    pub cancelled: bool,
}

/// Drives sequential image generation over a prompt list.
///
/// The controller retains the items, failures, progress, and state of the
/// most recent run for inspection; starting a new run clears them.
#[derive(Default)]
pub struct BatchController {
    state: BatchRunState,
    items: Vec<GeneratedItem>,
    failures: Vec<BatchFailure>,
    progress: BatchProgress,
    cancel: CancelFlag,
    cancelled: bool,
}

impl BatchController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current run state.
    pub fn state(&self) -> BatchRunState {
        self.state
    }

    /// Items generated so far, in completion order.
    pub fn items(&self) -> &[GeneratedItem] {
        &self.items
    }

    /// Failures recorded so far, in attempt order.
    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    /// Progress of the current or most recent run.
    pub fn progress(&self) -> BatchProgress {
        self.progress
    }

    /// Handle for requesting cooperative cancellation; clone it before
    /// starting the run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs one batch: one `edit_image` call per prompt, in order.
    ///
    /// An empty prompt list is a no-op: the state stays `Idle` and nothing
    /// is published. Otherwise previous results are cleared, the state
    /// moves to `Running`, and every prompt is attempted exactly once.
    /// Failures are recorded and published but never abort the run; the
    /// state always reaches `Finished`.
    pub async fn run<C, S>(
        &mut self,
        client: &C,
        reference: &EmbeddedImage,
        prompts: &PromptList,
        sink: &S,
    ) -> BatchSummary
    where
        C: GenerationClient + ?Sized,
        S: ProgressSink + ?Sized,
    {
        if prompts.is_empty() {
            return BatchSummary::default();
        }

        self.state = BatchRunState::Running;
        self.items.clear();
        self.failures.clear();
        self.cancelled = false;
        self.cancel.reset();
        self.progress = BatchProgress {
            completed: 0,
            total: prompts.len(),
        };
        sink.on_event(BatchEvent::Started {
            progress: self.progress,
        });

        for (index, prompt) in prompts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                tracing::debug!(completed = index, total = prompts.len(), "batch cancelled");
                break;
            }

            match client.edit_image(reference, prompt).await {
                Ok(edited) => {
                    let item = GeneratedItem::new(prompt.clone(), edited.into_embedded());
                    self.items.push(item.clone());
                    sink.on_event(BatchEvent::ItemCompleted { item });
                }
                Err(error) => {
                    tracing::warn!(prompt = %prompt, error = %error, "image edit failed, continuing batch");
                    let failure = BatchFailure {
                        prompt: prompt.clone(),
                        error: error.to_string(),
                    };
                    self.failures.push(failure.clone());
                    sink.on_event(BatchEvent::ItemFailed {
                        prompt: failure.prompt,
                        error: failure.error,
                    });
                }
            }

            self.progress.completed = index + 1;
            sink.on_event(BatchEvent::Progress(self.progress));
        }

        self.state = BatchRunState::Finished;
        sink.on_event(BatchEvent::Finished {
            progress: self.progress,
            cancelled: self.cancelled,
        });

        BatchSummary {
            succeeded: self.items.len(),
            failed: self.failures.len(),
            cancelled: self.cancelled,
        }
    }
}
