//! Data models for the data access engine.
//!
//! This module re-exports all model types used throughout the crate.

pub mod provider;
pub mod value;

// Re-export commonly used types
pub use provider::{IsolationLevel, PlaceholderStyle, Provider};
pub use value::{FromValue, Value};
