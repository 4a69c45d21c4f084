//! Utility functions and helpers.
//!
//! Common functionality used across multiple relay crates.

pub mod hash;

// Re-export commonly used utilities
pub use hash::{integrity, shasum};
