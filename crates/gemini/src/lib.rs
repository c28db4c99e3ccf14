//! Google Gemini `generateContent` client used as the bot's text generator.

pub mod api;
pub mod generator;

pub use api::{GeminiClient, GeminiConfig, GeminiError};
