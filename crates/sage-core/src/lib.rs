//! sage-core: The `ssage` command-line teaching assistant.
//!
//! Exposed as a library so integration tests can exercise the pieces the
//! binary wires together.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod pane;
pub mod prompts;
pub mod query;
pub mod render;
pub mod style;
pub mod usage;
