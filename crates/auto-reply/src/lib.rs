//! Away auto-responder: answers direct messages on behalf of an absent user.
//!
//! Flow: inbound message → eligibility checks → processing claim → optional
//! greeting → completion request → reply delivered via channel outbound.

pub mod classify;
pub mod commands;
pub mod completion;
pub mod delay;
pub mod error;
pub mod responder;
pub mod state;
pub mod text;
pub mod typing;

pub use {
    commands::Command,
    completion::{CompletionClient, ReplyGenerator},
    error::{Error, Result},
    responder::{AutoResponder, Dispatch, Rejection, ResponderParts, local_user},
    state::{ChannelStatus, StateStore},
};
