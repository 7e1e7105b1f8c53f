//! nbgen-ai: chat-completions client layer
//!
//! This crate provides the wire types for tool-augmented chat completions and
//! a non-streaming client for OpenRouter-compatible endpoints.

pub mod error;
pub mod providers;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Error, Result};
pub use types::*;
