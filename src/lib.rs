//! WhatsApp Chef Library
//!
//! Helps a small restaurant owner draft three WhatsApp Business templates
//! (welcome menu, bill and order confirmation) with a single Gemini call,
//! and previews them as chat bubbles with WhatsApp text formatting.

pub mod config;
pub mod constants;
pub mod formatter;
pub mod models;
pub mod preview;
pub mod services;
pub mod session;
pub mod web;
