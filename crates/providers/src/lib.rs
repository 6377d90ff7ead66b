//! LLM provider implementations.
//!
//! One provider today: Google's Generative Language API ([`GeminiProvider`]),
//! speaking the `generateContent` protocol used by the Gemma-hosted models.

pub mod gemini;

pub use gemini::GeminiProvider;
