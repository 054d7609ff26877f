//! Loading of the release policy.

use std::fs;
use std::io;
use std::path::Path;

/// Where the CLI looks for the policy by default, relative to the working
/// directory.
pub const DEFAULT_POLICY_PATH: &str = "workflows/release-workflow.txt";

/// The policy shipped with the crate.
pub const BUNDLED_POLICY: &str = include_str!("../workflows/release-workflow.txt");

/// Wraps a policy document into the instructions sent as the first turn.
pub fn policy_prompt(policy: &str) -> String {
    format!(
        "You are a Release Process assistant. You must only answer requests \
         related to Release Process.\n\n\
         Below is the exact policy that you must follow to create a release \
         for the user.\n\n\
         POLICY:\n{}",
        policy.trim()
    )
}

/// Reads a policy document and wraps it with [`policy_prompt`].
pub fn load_policy<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let path = path.as_ref();
    let policy = fs::read_to_string(path)?;
    if policy.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("policy file `{}` is empty", path.display()),
        ));
    }
    debug!("loaded policy from {}", path.display());
    Ok(policy_prompt(&policy))
}
