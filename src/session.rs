//! Screen navigation and per-session state.
//!
//! A session owns everything the original screens display: the uploaded
//! reference image, the raw prompt text, the batch controller behind the
//! gallery, and the suggestion list. All of it lives in memory only and is
//! discarded with the session.

use crate::batch::{BatchController, BatchSummary, GeneratedItem, ProgressSink};
use crate::client::GenerationClient;
use crate::error::Result;
use crate::image::EmbeddedImage;
use crate::prompts::{normalize_lines, PromptList, MAX_PROMPTS};
use crate::suggest::SuggestionController;
use std::time::Duration;

/// How long the splash screen stays up before the menu appears.
pub const SPLASH_DURATION: Duration = Duration::from_secs(4);

/// The screens a session can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Intro screen, auto-advances to the menu.
    #[default]
    Splash,
    /// Entry menu.
    MainMenu,
    /// Reference image upload.
    Home,
    /// Describe-and-expand prompt creation.
    CreatePrompts,
    /// Usage walkthrough.
    HowToUse,
    /// Prompt entry.
    Prompts,
    /// Generated results.
    Gallery,
    /// Full-size view of one generated item.
    Preview,
}

/// Single-shot deferred advance from the splash screen.
///
/// Aborts cleanly when the user navigates away before it fires.
pub struct SplashTimer {
    handle: tokio::task::JoinHandle<()>,
}

impl SplashTimer {
    /// Starts the timer; it elapses after [`SPLASH_DURATION`].
    pub fn start() -> Self {
        Self {
            handle: tokio::spawn(tokio::time::sleep(SPLASH_DURATION)),
        }
    }

    /// Cancels the pending advance.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Waits for the timer; returns false when it was cancelled.
    pub async fn elapsed(self) -> bool {
        self.handle.await.is_ok()
    }
}

/// In-memory state for one user session.
#[derive(Default)]
pub struct Session {
    screen: Screen,
    reference: Option<EmbeddedImage>,
    prompts_text: String,
    batch: BatchController,
    suggestions: SuggestionController,
    selected: Option<usize>,
}

impl Session {
    /// Creates a session on the splash screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen currently shown.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The uploaded reference image, if any.
    pub fn reference(&self) -> Option<&EmbeddedImage> {
        self.reference.as_ref()
    }

    /// Replaces the reference image wholesale.
    ///
    /// While a batch is running the session is exclusively borrowed by
    /// [`Session::generate`], so the reference cannot change mid-run.
    pub fn set_reference(&mut self, image: EmbeddedImage) {
        self.reference = Some(image);
    }

    /// The raw prompt-entry text.
    pub fn prompts_text(&self) -> &str {
        &self.prompts_text
    }

    /// Replaces the prompt-entry text.
    pub fn set_prompts_text(&mut self, text: impl Into<String>) {
        self.prompts_text = text.into();
    }

    /// Live count of qualifying prompt lines, for the `n / 50` indicator.
    pub fn prompt_count(&self) -> usize {
        normalize_lines(&self.prompts_text).len()
    }

    /// The batch behind the gallery.
    pub fn batch(&self) -> &BatchController {
        &self.batch
    }

    /// The suggestion list shown on the create-prompts screen.
    pub fn suggestions(&self) -> &SuggestionController {
        &self.suggestions
    }

    /// The item shown on the preview screen, if one is selected.
    pub fn selected_item(&self) -> Option<&GeneratedItem> {
        self.batch.items().get(self.selected?)
    }

    // --- Transitions ---
    //
    // Each returns whether the transition applied; an invalid transition
    // leaves the session unchanged.

    /// `Splash -> MainMenu`, on timer expiry or early skip.
    pub fn finish_splash(&mut self) -> bool {
        self.transition(Screen::Splash, Screen::MainMenu)
    }

    /// `MainMenu -> Home`; also the "Create Image" exit of `CreatePrompts`.
    pub fn open_home(&mut self) -> bool {
        match self.screen {
            Screen::MainMenu | Screen::CreatePrompts => {
                self.screen = Screen::Home;
                true
            }
            _ => false,
        }
    }

    /// `MainMenu -> CreatePrompts`.
    pub fn open_create_prompts(&mut self) -> bool {
        self.transition(Screen::MainMenu, Screen::CreatePrompts)
    }

    /// `MainMenu -> HowToUse`.
    pub fn open_how_to_use(&mut self) -> bool {
        self.transition(Screen::MainMenu, Screen::HowToUse)
    }

    /// Back to the menu from its child screens.
    pub fn back_to_menu(&mut self) -> bool {
        match self.screen {
            Screen::Home | Screen::CreatePrompts | Screen::HowToUse => {
                self.screen = Screen::MainMenu;
                true
            }
            _ => false,
        }
    }

    /// `Home -> Prompts`; requires an uploaded reference image.
    pub fn open_prompts(&mut self) -> bool {
        if self.screen == Screen::Home && self.reference.is_some() {
            self.screen = Screen::Prompts;
            true
        } else {
            false
        }
    }

    /// `Prompts -> Home`, back without generating.
    pub fn back_to_home(&mut self) -> bool {
        self.transition(Screen::Prompts, Screen::Home)
    }

    /// `Gallery -> Preview` for the item at `index`.
    pub fn select_item(&mut self, index: usize) -> bool {
        if self.screen == Screen::Gallery && index < self.batch.items().len() {
            self.selected = Some(index);
            self.screen = Screen::Preview;
            true
        } else {
            false
        }
    }

    /// `Preview -> Gallery`.
    pub fn close_preview(&mut self) -> bool {
        if self.transition(Screen::Preview, Screen::Gallery) {
            self.selected = None;
            true
        } else {
            false
        }
    }

    /// `Gallery -> Home` to start over ("New").
    pub fn new_batch(&mut self) -> bool {
        self.transition(Screen::Gallery, Screen::Home)
    }

    fn transition(&mut self, from: Screen, to: Screen) -> bool {
        if self.screen == from {
            self.screen = to;
            true
        } else {
            false
        }
    }

    // --- Controller entry points ---

    /// Parses the prompt text and runs a batch against the reference image.
    ///
    /// Validation failures ([`crate::MultiGenError::TooManyPrompts`])
    /// propagate before anything starts. A missing reference or an empty
    /// prompt list is a no-op, as in the original flow. Otherwise the
    /// session shows the gallery and the batch streams into it.
    pub async fn generate<C, S>(&mut self, client: &C, sink: &S) -> Result<BatchSummary>
    where
        C: GenerationClient + ?Sized,
        S: ProgressSink + ?Sized,
    {
        let prompts = PromptList::parse(&self.prompts_text, MAX_PROMPTS)?;
        let Some(reference) = self.reference.clone() else {
            return Ok(BatchSummary::default());
        };
        if prompts.is_empty() {
            return Ok(BatchSummary::default());
        }

        self.screen = Screen::Gallery;
        self.selected = None;
        Ok(self.batch.run(client, &reference, &prompts, sink).await)
    }

    /// Expands a description into suggested prompts for the
    /// create-prompts screen.
    pub async fn create_prompts<C>(&mut self, client: &C, description: &str) -> Result<&[String]>
    where
        C: GenerationClient + ?Sized,
    {
        self.suggestions.create(client, description).await
    }
}
