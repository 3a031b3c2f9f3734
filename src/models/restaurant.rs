//! Restaurant description edited by the owner before generating templates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Voice the generated messages should be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Playful, emoji-heavy copy
    #[default]
    Fun,
    /// Polite and concise
    Professional,
    /// Warm and conversational
    Friendly,
}

impl Tone {
    /// Returns all tones in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Fun, Self::Professional, Self::Friendly]
    }

    /// Human-readable label.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Fun => "Fun",
            Self::Professional => "Professional",
            Self::Friendly => "Friendly",
        }
    }

    /// Style guidance handed to the generator.
    #[must_use]
    pub const fn prompt_hint(&self) -> &'static str {
        match self {
            Self::Fun => "fun, energetic and emoji-rich",
            Self::Professional => "professional, polite and concise with few emojis",
            Self::Friendly => "warm, friendly and conversational with a few emojis",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single dish on the menu.
///
/// The id is opaque and stays stable while the item is edited or other
/// items are removed around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Unique identifier within the menu
    pub id: String,
    /// Dish name
    pub name: String,
    /// Free-form price text (e.g. "$12", "₹250")
    pub price: String,
}

impl MenuItem {
    /// Creates a menu item with a freshly generated id.
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            price: price.into(),
        }
    }

    /// Creates an empty menu item, as produced by "Add Item".
    #[must_use]
    pub fn blank() -> Self {
        Self::new("", "")
    }
}

/// Addressable field of a [`MenuItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuItemField {
    /// The dish name
    Name,
    /// The price text
    Price,
}

/// Everything the owner tells us about the restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantConfig {
    /// Business name
    pub name: String,
    /// Cuisine or vibe
    pub cuisine: String,
    /// UPI id or payment link quoted in the bill template
    pub payment_handle: String,
    /// Popular menu items, in display order
    pub menu_items: Vec<MenuItem>,
    /// Voice of the generated copy
    pub tone: Tone,
}

impl Default for RestaurantConfig {
    fn default() -> Self {
        Self {
            name: "Burger & Bites".to_string(),
            cuisine: "American Fast Food".to_string(),
            payment_handle: "9876543210@upi".to_string(),
            menu_items: vec![
                MenuItem::new("Cheesy Smash Burger", "$12"),
                MenuItem::new("Pepperoni Pizza XL", "$18"),
                MenuItem::new("Truffle Fries", "$8"),
            ],
            tone: Tone::Fun,
        }
    }
}

impl RestaurantConfig {
    /// Creates an empty configuration with no menu items.
    pub fn new(
        name: impl Into<String>,
        cuisine: impl Into<String>,
        payment_handle: impl Into<String>,
        tone: Tone,
    ) -> Self {
        Self {
            name: name.into(),
            cuisine: cuisine.into(),
            payment_handle: payment_handle.into(),
            menu_items: Vec::new(),
            tone,
        }
    }

    /// Appends a blank menu item and returns a copy of it.
    pub fn add_menu_item(&mut self) -> MenuItem {
        let item = MenuItem::blank();
        self.menu_items.push(item.clone());
        item
    }

    /// Removes the item with the given id. Returns whether anything was removed.
    pub fn remove_menu_item(&mut self, id: &str) -> bool {
        let before = self.menu_items.len();
        self.menu_items.retain(|item| item.id != id);
        self.menu_items.len() != before
    }

    /// Replaces one field of the item with the given id.
    ///
    /// Returns whether an item was found. The value is stored as-is.
    pub fn update_menu_item(&mut self, id: &str, field: MenuItemField, value: &str) -> bool {
        let Some(item) = self.menu_items.iter_mut().find(|item| item.id == id) else {
            return false;
        };

        match field {
            MenuItemField::Name => item.name = value.to_string(),
            MenuItemField::Price => item.price = value.to_string(),
        }
        true
    }

    /// Looks up a menu item by id.
    #[must_use]
    pub fn menu_item(&self, id: &str) -> Option<&MenuItem> {
        self.menu_items.iter().find(|item| item.id == id)
    }
}
