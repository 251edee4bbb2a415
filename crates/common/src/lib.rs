//! Shared types and error definitions used across the afk crates.

pub mod error;
pub mod types;

pub use error::{Error, FromMessage, Result};
