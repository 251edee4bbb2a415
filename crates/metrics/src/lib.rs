//! Metric definitions for afk.
//!
//! Uses the `metrics` crate facade: nothing is recorded until the embedding
//! application installs a recorder.
//!
//! ```rust,ignore
//! use afk_metrics::{auto_reply, counter};
//!
//! counter!(auto_reply::MESSAGES_RECEIVED_TOTAL).increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
