//! Data models for the restaurant description and generated templates.

pub mod messages;
pub mod restaurant;

pub use messages::{GeneratedMessages, MessageSlot};
pub use restaurant::{MenuItem, MenuItemField, RestaurantConfig, Tone};
