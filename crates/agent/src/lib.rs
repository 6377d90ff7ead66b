//! The reply pipeline.
//!
//! [`assembler`] folds persona and context blocks into one system prompt;
//! [`handler::MessageHandler`] runs the full pipeline for one incoming
//! message: fact extraction, context assembly, the model call, and the
//! post-reply bookkeeping.

pub mod assembler;
pub mod handler;

pub use handler::MessageHandler;
