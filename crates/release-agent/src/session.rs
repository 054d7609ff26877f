use release_agent_core::{Error, Orchestrator, OrchestratorBuilder, SessionState};
use release_agent_core::conversation::Transcript;
use release_agent_model::ModelProvider;

use crate::policy::{BUNDLED_POLICY, policy_prompt};
use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    orchestrator_builder: OrchestratorBuilder,
    policy: Option<String>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let orchestrator_builder =
            OrchestratorBuilder::with_model_provider(provider);
        Self {
            orchestrator_builder,
            policy: None,
        }
    }

    /// Sets the complete policy prompt, usually from
    /// [`load_policy`](crate::load_policy). Defaults to the bundled policy.
    #[inline]
    pub fn with_policy<S: Into<String>>(mut self, policy: S) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Caps the number of model calls for a single message.
    #[inline]
    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.orchestrator_builder = self
            .orchestrator_builder
            .with_max_round_trips(max_round_trips);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Result<Session, Error> {
        let policy = self
            .policy
            .unwrap_or_else(|| policy_prompt(BUNDLED_POLICY));
        let orchestrator = self
            .orchestrator_builder
            .with_policy(policy)
            .with_tool(CreateChangeContextTool::new())
            .with_tool(CreateKitzTool::new())
            .with_tool(SearchPreviousKmnrsTool::new())
            .build()?;

        Ok(Session { orchestrator })
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured orchestrator, and it is basically a
/// wrapper around [`Orchestrator`].
pub struct Session {
    orchestrator: Orchestrator,
}

impl Session {
    /// Sends a message and waits for the reply.
    ///
    /// A failed call leaves the session usable; send the next message as
    /// usual.
    #[inline]
    pub async fn respond(&mut self, message: &str) -> Result<String, Error> {
        self.orchestrator.respond(message).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        self.orchestrator.transcript()
    }

    /// Returns what the session is waiting for.
    #[inline]
    pub fn state(&self) -> &SessionState {
        self.orchestrator.state()
    }
}
