//! Chat bubble preview for a single generated message.
//!
//! A [`MessagePreview`] renders one message the way WhatsApp would show it
//! and owns the transient "Copied" acknowledgment of its copy button.
//!
//! # Copy feedback
//!
//! Every [`MessagePreview::copy`] call sets the copied flag and schedules its
//! own reset [`COPY_FEEDBACK_MS`] later. Resets are not cancelled by later
//! copies, so an earlier reset still fires at its original deadline. Pending
//! resets are aborted when the preview is dropped.

pub mod clipboard;

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Timelike;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::COPY_FEEDBACK_MS;
use crate::formatter::{format_html, SafeHtml};

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard, SystemClipboard};

/// Indicator shown on bubbles sent by the user.
pub const SENT_INDICATOR: &str = "✓✓";

/// Whether the copy button is currently acknowledging a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyState {
    /// Button shows "Copy Text"
    Idle,
    /// Button shows "Copied"
    RecentlyCopied,
}

/// Result of a copy action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    /// Copy state right after the action (always recently copied)
    pub state: CopyState,
    /// Transient warning when the clipboard write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Everything needed to draw one chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bubble {
    /// Heading above the bubble
    pub title: String,
    /// Escaped, formatted message body
    pub html: SafeHtml,
    /// Wall-clock time at render, `HH:MM`
    pub time: String,
    /// Whether the bubble sits on the sender's side
    pub sent_by_user: bool,
    /// Double check mark, only for sent bubbles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_indicator: Option<&'static str>,
    /// Copy button state
    pub copy_state: CopyState,
    /// Copy button label
    pub copy_label: &'static str,
    /// Transient clipboard warning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Default)]
struct Feedback {
    copied: bool,
    notice: Option<String>,
}

/// One generated message rendered as a chat bubble.
pub struct MessagePreview {
    title: String,
    text: String,
    sent_by_user: bool,
    clipboard: Arc<dyn Clipboard>,
    feedback: Arc<Mutex<Feedback>>,
    resets: Mutex<Vec<JoinHandle<()>>>,
}

impl MessagePreview {
    /// Creates a preview for `text`.
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        sent_by_user: bool,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            sent_by_user,
            clipboard,
            feedback: Arc::new(Mutex::new(Feedback::default())),
            resets: Mutex::new(Vec::new()),
        }
    }

    /// Bubble heading.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Raw, unformatted message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the bubble is drawn as sent by the user.
    #[must_use]
    pub fn sent_by_user(&self) -> bool {
        self.sent_by_user
    }

    /// Current copy state.
    #[must_use]
    pub fn copy_state(&self) -> CopyState {
        if self.lock_feedback().copied {
            CopyState::RecentlyCopied
        } else {
            CopyState::Idle
        }
    }

    /// Shorthand for `copy_state() == CopyState::RecentlyCopied`.
    #[must_use]
    pub fn is_copied(&self) -> bool {
        self.copy_state() == CopyState::RecentlyCopied
    }

    /// Copies the raw text to the clipboard and shows "Copied" for two seconds.
    ///
    /// The clipboard write runs on the blocking pool. The flag is set even
    /// when the write fails; the failure is returned as a notice and shown on
    /// the bubble until the reset.
    pub async fn copy(&self) -> CopyOutcome {
        let clipboard = Arc::clone(&self.clipboard);
        let text = self.text.clone();
        let written = tokio::task::spawn_blocking(move || clipboard.write_text(&text))
            .await
            .unwrap_or_else(|e| Err(ClipboardError::Write(format!("clipboard task failed: {e}"))));

        let notice = match written {
            Ok(()) => {
                debug!("Copied \"{}\" ({} bytes)", self.title, self.text.len());
                None
            }
            Err(e) => {
                warn!("Copy of \"{}\" failed: {}", self.title, e);
                Some(format!("Could not copy to clipboard: {e}"))
            }
        };

        {
            let mut feedback = self.lock_feedback();
            feedback.copied = true;
            feedback.notice.clone_from(&notice);
        }

        self.schedule_reset();

        CopyOutcome {
            state: CopyState::RecentlyCopied,
            notice,
        }
    }

    /// Renders the bubble using the current local time.
    #[must_use]
    pub fn render(&self) -> Bubble {
        self.render_at(&chrono::Local::now())
    }

    /// Renders the bubble with `now` as the displayed time.
    #[must_use]
    pub fn render_at(&self, now: &impl Timelike) -> Bubble {
        let (copied, notice) = {
            let feedback = self.lock_feedback();
            (feedback.copied, feedback.notice.clone())
        };

        Bubble {
            title: self.title.clone(),
            html: format_html(&self.text),
            time: format!("{:02}:{:02}", now.hour(), now.minute()),
            sent_by_user: self.sent_by_user,
            sent_indicator: self.sent_by_user.then_some(SENT_INDICATOR),
            copy_state: if copied {
                CopyState::RecentlyCopied
            } else {
                CopyState::Idle
            },
            copy_label: if copied { "Copied" } else { "Copy Text" },
            notice,
        }
    }

    fn schedule_reset(&self) {
        let feedback: Weak<Mutex<Feedback>> = Arc::downgrade(&self.feedback);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(COPY_FEEDBACK_MS)).await;
            if let Some(feedback) = feedback.upgrade() {
                let mut feedback = feedback.lock().unwrap_or_else(PoisonError::into_inner);
                feedback.copied = false;
                feedback.notice = None;
            }
        });

        let mut resets = self.resets.lock().unwrap_or_else(PoisonError::into_inner);
        resets.retain(|reset| !reset.is_finished());
        resets.push(handle);
    }

    fn lock_feedback(&self) -> std::sync::MutexGuard<'_, Feedback> {
        self.feedback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MessagePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePreview")
            .field("title", &self.title)
            .field("text", &self.text)
            .field("sent_by_user", &self.sent_by_user)
            .field("copy_state", &self.copy_state())
            .finish_non_exhaustive()
    }
}

impl Drop for MessagePreview {
    fn drop(&mut self) {
        let resets = self.resets.get_mut().unwrap_or_else(PoisonError::into_inner);
        for reset in resets.drain(..) {
            reset.abort();
        }
    }
}
