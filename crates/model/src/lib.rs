//! An abstraction layer for chat-completion models with function calling.
//!
//! This crate establishes the protocol the orchestrator uses to talk to a
//! completion provider: a transcript of messages plus a tool catalog goes
//! in, and a stream of events describing text and (at most one) tool call
//! comes out.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
