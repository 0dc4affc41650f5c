//! Backend client module for the Generative Language API.

mod gemini;

pub use gemini::{GeminiBackend, GeneratedText};
