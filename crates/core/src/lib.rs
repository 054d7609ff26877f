//! Core logic of the release assistant: the transcript, the tool catalog,
//! and the orchestrator that drives tool calls between the user and the
//! model.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod error;
mod model_client;
mod orchestrator;
pub mod tool;

pub use error::{Error, ErrorKind};
pub use orchestrator::{
    DEFAULT_MAX_ROUND_TRIPS, Orchestrator, OrchestratorBuilder, RESET_ACK,
    SessionState,
};
