//! A release process assistant that assembles the release tools, the
//! policy and a model provider.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the assistant into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod policy;
mod session;
pub mod tools;

pub use policy::{BUNDLED_POLICY, DEFAULT_POLICY_PATH, load_policy, policy_prompt};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`release_agent_core`] crate.
pub mod core {
    pub use release_agent_core::*;
}
