//! gembridge - OpenAI-compatible proxy for the Google Generative Language API
//!
//! This library provides the core functionality for the gembridge proxy:
//! request/response translation between the OpenAI and Gemini wire formats,
//! and the priority-ordered endpoint fallback chain.

pub mod backend;
pub mod config;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
