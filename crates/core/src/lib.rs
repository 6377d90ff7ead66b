//! # Bumblebot Core
//!
//! Domain types, traits, and error definitions for the Bumblebot chat
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod channel;
pub mod error;
pub mod facts;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelMessage, ReplyContext};
pub use error::{Error, Result};
pub use facts::{ExtractedFact, FactExtractor, FactMap, FactStore, UserFact};
pub use message::{DialogueTurn, GroupMessage, Role};
pub use provider::{ChatRequest, ChatResponse, Provider};
