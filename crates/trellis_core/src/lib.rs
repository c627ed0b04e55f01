//! trellis_core - foundation types for the Trellis server-side UI engine.
//!
//! This crate provides:
//! - [`MarkupBuilder`], an indenting, tag-balancing HTML buffer
//! - [`StateMap`] and [`StateProvider`], the JSON state that widgets render from
//! - The shared [`CoreError`] type
//!
//! It knows nothing about widgets or sessions.

pub mod error;
pub mod markup;
pub mod state;

pub use error::{CoreError, Result};
pub use markup::{MarkupBuilder, VerifyToken};
pub use state::{problem_key, StateMap, StateProvider, PROBLEM_SUFFIX};

/// Re-export for callers that build state values directly
pub use serde_json::{json, Value};
