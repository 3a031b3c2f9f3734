//! The three WhatsApp templates produced by one generation.

use serde::{Deserialize, Serialize};

/// Result of a successful generation. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMessages {
    /// Welcome and menu auto-reply
    pub welcome_message: String,
    /// Bill template sent manually by staff
    pub bill_template: String,
    /// Order confirmation auto-reply
    pub kitchen_message: String,
}

impl GeneratedMessages {
    /// Creates a message set.
    pub fn new(
        welcome_message: impl Into<String>,
        bill_template: impl Into<String>,
        kitchen_message: impl Into<String>,
    ) -> Self {
        Self {
            welcome_message: welcome_message.into(),
            bill_template: bill_template.into(),
            kitchen_message: kitchen_message.into(),
        }
    }

    /// Returns the text for a preview slot.
    #[must_use]
    pub fn text_for(&self, slot: MessageSlot) -> &str {
        match slot {
            MessageSlot::Welcome => &self.welcome_message,
            MessageSlot::Bill => &self.bill_template,
            MessageSlot::Kitchen => &self.kitchen_message,
        }
    }
}

/// Position of a message in the preview pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSlot {
    /// "1. Welcome & Menu (Auto-reply)"
    Welcome,
    /// "2. Bill Template (Manual Send)"
    Bill,
    /// "3. Confirmation (Auto-reply)"
    Kitchen,
}

impl MessageSlot {
    /// Returns all slots in display order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Welcome, Self::Bill, Self::Kitchen]
    }

    /// Bubble heading shown above the message.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Welcome => "1. Welcome & Menu (Auto-reply)",
            Self::Bill => "2. Bill Template (Manual Send)",
            Self::Kitchen => "3. Confirmation (Auto-reply)",
        }
    }

    /// Parses a slot from its lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "welcome" => Some(Self::Welcome),
            "bill" => Some(Self::Bill),
            "kitchen" => Some(Self::Kitchen),
            _ => None,
        }
    }
}
