//! Domain core for the chaincast posting bot.
//!
//! Holds the project catalog, the pure dispatch-cursor contracts, content
//! shaping and prompt building, and the traits the pipeline uses to talk to
//! its collaborators (state store, text generator, publisher). This crate has
//! zero internal dependencies so every other crate can build on it.

pub mod catalog;
pub mod content;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod hashing;
pub mod memory_store;
pub mod ports;
pub mod prompt;
pub mod types;
