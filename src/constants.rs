//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and timing values shared by the
//! preview and session layers.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "WhatsApp Chef";

/// The binary name of the application (used in command examples, lowercase with hyphens).
pub const APP_BINARY_NAME: &str = "whatsapp-chef";

/// Directory name used under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "WhatsAppChef";

/// How long the "Copied" acknowledgment stays visible after a copy, in milliseconds.
pub const COPY_FEEDBACK_MS: u64 = 2000;

/// User-facing message shown when no generation credential is configured.
pub const MISSING_API_KEY_MESSAGE: &str =
    "API Key is missing. Please check your environment configuration.";

/// User-facing message shown when a generation is already running.
pub const BUSY_MESSAGE: &str = "Generation already in progress. Please wait for it to complete.";
