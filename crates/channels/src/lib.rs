//! Host-application seams.
//!
//! The responder never talks to a chat client directly: it posts messages and
//! typing signals through [`ChannelOutbound`] and reports user-visible
//! notifications through [`ChannelEventSink`].

pub mod error;
pub mod gating;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{ChannelEvent, ChannelEventSink, ChannelOutbound, NoticeLevel},
};
