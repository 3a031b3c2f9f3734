//! Clipboard access for the "Copy Text" action.
//!
//! The preview only needs a write-only, best-effort clipboard. The system
//! implementation wraps `arboard`; [`MemoryClipboard`] keeps copies in memory
//! for headless servers and tests.

use std::sync::Mutex;

use thiserror::Error;

/// Clipboard write failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// No clipboard could be opened (e.g. no display server).
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    /// The clipboard refused the text.
    #[error("failed to write to clipboard: {0}")]
    Write(String),
}

/// Destination for copied message text.
pub trait Clipboard: Send + Sync {
    /// Writes `text` to the clipboard, replacing its contents.
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The operating system clipboard.
///
/// A fresh `arboard` handle is opened for each write so the type stays
/// `Send + Sync` on every platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    /// Creates a handle to the system clipboard.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// In-memory clipboard that records every write.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    /// Written texts, oldest first
    history: Mutex<Vec<String>>,
    /// When set, every write fails with this reason
    failure: Option<String>,
}

impl MemoryClipboard {
    /// Creates an empty clipboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clipboard whose writes always fail.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    /// Returns the most recently written text.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
    }

    /// Returns how many writes succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.history.lock().map(|history| history.len()).unwrap_or(0)
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if let Some(reason) = &self.failure {
            return Err(ClipboardError::Write(reason.clone()));
        }

        self.history
            .lock()
            .map_err(|_| ClipboardError::Unavailable("clipboard lock poisoned".to_string()))?
            .push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_new() {
        let clipboard = MemoryClipboard::new();
        assert!(clipboard.contents().is_none());
        assert_eq!(clipboard.write_count(), 0);
    }

    #[test]
    fn test_memory_clipboard_keeps_latest() {
        let clipboard = MemoryClipboard::new();
        clipboard.write_text("first").unwrap();
        clipboard.write_text("second").unwrap();

        assert_eq!(clipboard.contents().as_deref(), Some("second"));
        assert_eq!(clipboard.write_count(), 2);
    }

    #[test]
    fn test_failing_clipboard() {
        let clipboard = MemoryClipboard::failing("no display");
        let err = clipboard.write_text("hello").unwrap_err();

        assert_eq!(err, ClipboardError::Write("no display".to_string()));
        assert!(err.to_string().contains("no display"));
        assert!(clipboard.contents().is_none());
    }
}
