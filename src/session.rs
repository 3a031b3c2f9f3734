//! Session state for one owner filling in the form.
//!
//! A [`Session`] owns the restaurant description, the generation lifecycle,
//! the last generated messages and the three preview bubbles built from them.
//! Everything lives in memory and is gone when the process exits.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──generate──▶ Loading ──ok──▶ Ready
//!   ▲                   │
//!   └──── retry ◀── Error(msg)
//! ```
//!
//! - A missing API key fails before anything else and leaves the status alone.
//! - Only one generation runs at a time; a second call gets [`GenerateError::Busy`].
//! - A failed regeneration keeps the previous messages and previews.
//! - The request runs in its own task and holds only a weak reference to the
//!   session, so it finishes even if the caller goes away and never updates a
//!   closed or dropped session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::{BUSY_MESSAGE, MISSING_API_KEY_MESSAGE};
use crate::models::{
    GeneratedMessages, MenuItem, MenuItemField, MessageSlot, RestaurantConfig, Tone,
};
use crate::preview::{Bubble, Clipboard, CopyOutcome, MessagePreview};
use crate::services::{ApiKey, CopyGenerator, GenerationError};

/// Phase of the generation process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Nothing generated yet, or ready to retry
    Idle,
    /// A request is in flight
    Loading,
    /// The last request failed with this message
    Error(String),
    /// Messages are available
    Ready,
}

/// Which pane is in front on narrow screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    /// The restaurant form
    #[default]
    Config,
    /// The chat preview
    Preview,
}

/// Why [`Session::generate`] did not produce messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// No API key configured. The generator was not called.
    #[error("{}", MISSING_API_KEY_MESSAGE)]
    MissingCredential,
    /// Another generation is still running.
    #[error("{}", BUSY_MESSAGE)]
    Busy,
    /// The generator failed; the message is passed through verbatim.
    #[error("{0}")]
    Generation(String),
    /// The session was closed before the result arrived.
    #[error("Session closed")]
    Closed,
}

/// Edit of the non-menu fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsUpdate {
    /// New business name
    pub name: Option<String>,
    /// New cuisine or vibe
    pub cuisine: Option<String>,
    /// New UPI id or payment link
    pub payment_handle: Option<String>,
    /// New tone
    pub tone: Option<Tone>,
}

/// Read-only view of the session for the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current restaurant description
    pub config: RestaurantConfig,
    /// Generation status
    pub status: GenerationStatus,
    /// Inline message shown under the generate button
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pane in front
    pub view: ActiveView,
    /// Whether a message set exists
    pub has_messages: bool,
    /// Whether an API key is configured
    pub has_api_key: bool,
}

/// A rendered bubble tagged with its slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotBubble {
    /// Which message this is
    pub slot: MessageSlot,
    /// The rendered bubble
    #[serde(flatten)]
    pub bubble: Bubble,
}

#[derive(Debug)]
struct SessionState {
    config: RestaurantConfig,
    status: GenerationStatus,
    error: Option<String>,
    view: ActiveView,
    messages: Option<GeneratedMessages>,
    previews: Vec<(MessageSlot, Arc<MessagePreview>)>,
    closed: bool,
}

/// Handle to one in-memory session. Clones share the same state.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    generator: Arc<dyn CopyGenerator>,
    clipboard: Arc<dyn Clipboard>,
    api_key: Option<ApiKey>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session starting from the demo restaurant.
    pub fn new(
        api_key: Option<ApiKey>,
        generator: Arc<dyn CopyGenerator>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self::with_config(RestaurantConfig::default(), api_key, generator, clipboard)
    }

    /// Creates a session starting from `config`.
    pub fn with_config(
        config: RestaurantConfig,
        api_key: Option<ApiKey>,
        generator: Arc<dyn CopyGenerator>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                config,
                status: GenerationStatus::Idle,
                error: None,
                view: ActiveView::Config,
                messages: None,
                previews: Vec::new(),
                closed: false,
            })),
            generator,
            clipboard,
            api_key,
        }
    }

    // ------------------------------------------------------------------
    // Menu editing
    // ------------------------------------------------------------------

    /// Appends a blank menu item and returns it.
    pub fn add_menu_item(&self) -> MenuItem {
        let item = self.lock().config.add_menu_item();
        debug!("Added menu item {}", item.id);
        item
    }

    /// Removes the menu item with `id`. Unknown ids are ignored.
    pub fn remove_menu_item(&self, id: &str) -> bool {
        let removed = self.lock().config.remove_menu_item(id);
        debug!("Remove menu item {}: {}", id, removed);
        removed
    }

    /// Sets one field of the menu item with `id`. Unknown ids are ignored.
    pub fn update_menu_item(&self, id: &str, field: MenuItemField, value: &str) -> bool {
        self.lock().config.update_menu_item(id, field, value)
    }

    /// Edits name, cuisine, payment handle or tone.
    pub fn update_details(&self, update: DetailsUpdate) {
        let mut state = self.lock();
        let config = &mut state.config;
        if let Some(name) = update.name {
            config.name = name;
        }
        if let Some(cuisine) = update.cuisine {
            config.cuisine = cuisine;
        }
        if let Some(payment_handle) = update.payment_handle {
            config.payment_handle = payment_handle;
        }
        if let Some(tone) = update.tone {
            config.tone = tone;
        }
    }

    /// Copy of the current restaurant description.
    #[must_use]
    pub fn config(&self) -> RestaurantConfig {
        self.lock().config.clone()
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Asks the generator for new messages.
    ///
    /// On success the messages are stored, the previews rebuilt, the status
    /// becomes [`GenerationStatus::Ready`] and the preview pane comes to the
    /// front. On failure the error is recorded for display and the previous
    /// messages are kept.
    pub async fn generate(&self) -> Result<GeneratedMessages, GenerateError> {
        let Some(api_key) = self.api_key.clone() else {
            warn!("Generate requested without an API key");
            self.lock().error = Some(MISSING_API_KEY_MESSAGE.to_string());
            return Err(GenerateError::MissingCredential);
        };

        let snapshot = {
            let mut state = self.lock();
            if state.closed {
                return Err(GenerateError::Closed);
            }
            if state.status == GenerationStatus::Loading {
                debug!("Generate rejected: already in progress");
                return Err(GenerateError::Busy);
            }
            state.status = GenerationStatus::Loading;
            state.error = None;
            state.config.clone()
        };

        info!(
            "Generation started for \"{}\" ({} menu items)",
            snapshot.name,
            snapshot.menu_items.len()
        );

        let weak = Arc::downgrade(&self.state);
        let generator = Arc::clone(&self.generator);
        let clipboard = Arc::clone(&self.clipboard);

        let task = tokio::spawn(async move {
            let result = generator.generate_copy(&api_key, &snapshot).await;
            apply_result(&weak, &clipboard, result)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("Generation task failed: {e}");
                warn!("{}", message);
                let mut state = self.lock();
                state.status = GenerationStatus::Error(message.clone());
                state.error = Some(message.clone());
                Err(GenerateError::Generation(message))
            }
        }
    }

    /// Current generation status.
    #[must_use]
    pub fn status(&self) -> GenerationStatus {
        self.lock().status.clone()
    }

    /// Inline message for the form, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Last successfully generated messages.
    #[must_use]
    pub fn messages(&self) -> Option<GeneratedMessages> {
        self.lock().messages.clone()
    }

    /// Last messages as pretty-printed JSON, for saving to a file.
    #[must_use]
    pub fn export(&self) -> Option<String> {
        let messages = self.messages()?;
        serde_json::to_string_pretty(&messages).ok()
    }

    // ------------------------------------------------------------------
    // View & preview
    // ------------------------------------------------------------------

    /// Pane in front.
    #[must_use]
    pub fn view(&self) -> ActiveView {
        self.lock().view
    }

    /// Brings a pane to the front.
    pub fn set_view(&self, view: ActiveView) {
        self.lock().view = view;
    }

    /// Renders all bubbles with the current local time.
    #[must_use]
    pub fn previews(&self) -> Vec<SlotBubble> {
        self.previews_at(&chrono::Local::now())
    }

    /// Renders all bubbles with `now` as the displayed time.
    #[must_use]
    pub fn previews_at(&self, now: &impl Timelike) -> Vec<SlotBubble> {
        self.lock()
            .previews
            .iter()
            .map(|(slot, preview)| SlotBubble {
                slot: *slot,
                bubble: preview.render_at(now),
            })
            .collect()
    }

    /// Copies the message in `slot`. Returns `None` before the first generation.
    ///
    /// The session lock is released before the clipboard is touched.
    pub async fn copy(&self, slot: MessageSlot) -> Option<CopyOutcome> {
        let preview = self
            .lock()
            .previews
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, preview)| Arc::clone(preview))?;

        Some(preview.copy().await)
    }

    /// Summary for the form.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            config: state.config.clone(),
            status: state.status.clone(),
            error: state.error.clone(),
            view: state.view,
            has_messages: state.messages.is_some(),
            has_api_key: self.api_key.is_some(),
        }
    }

    /// Tears the session down: previews are dropped and any in-flight
    /// result will be discarded.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.previews.clear();
        if state.status == GenerationStatus::Loading {
            state.status = GenerationStatus::Idle;
        }
        info!("Session closed");
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stores a finished generation in the session, if it still exists.
fn apply_result(
    weak: &Weak<Mutex<SessionState>>,
    clipboard: &Arc<dyn Clipboard>,
    result: Result<GeneratedMessages, GenerationError>,
) -> Result<GeneratedMessages, GenerateError> {
    let Some(state) = weak.upgrade() else {
        debug!("Session dropped before generation finished; discarding result");
        return Err(GenerateError::Closed);
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

    if state.closed {
        debug!("Session closed before generation finished; discarding result");
        return Err(GenerateError::Closed);
    }

    match result {
        Ok(messages) => {
            state.previews = build_previews(&messages, clipboard);
            state.messages = Some(messages.clone());
            state.status = GenerationStatus::Ready;
            state.view = ActiveView::Preview;
            state.error = None;
            info!("Generation finished: Loading → Ready");
            Ok(messages)
        }
        Err(e) => {
            let message = e.to_string();
            warn!("Generation failed: Loading → Error ({})", message);
            state.status = GenerationStatus::Error(message.clone());
            state.error = Some(message.clone());
            Err(GenerateError::Generation(message))
        }
    }
}

fn build_previews(
    messages: &GeneratedMessages,
    clipboard: &Arc<dyn Clipboard>,
) -> Vec<(MessageSlot, Arc<MessagePreview>)> {
    MessageSlot::all()
        .into_iter()
        .map(|slot| {
            (
                slot,
                Arc::new(MessagePreview::new(
                    slot.title(),
                    messages.text_for(slot),
                    false,
                    Arc::clone(clipboard),
                )),
            )
        })
        .collect()
}
