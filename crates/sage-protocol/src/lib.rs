//! sage-protocol: Shared chat types for ShellSage.
//!
//! This crate defines the request, response, and streaming types used between
//! the `ssage` CLI and the LLM provider adapters. No I/O happens here.

pub mod chat;
pub mod query;

pub use chat::{ChatMessage, ChatRequest, RequestError, Role, StreamEvent};
pub use query::QueryContext;
