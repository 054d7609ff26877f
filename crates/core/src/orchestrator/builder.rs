use release_agent_model::ModelProvider;

use super::{DEFAULT_MAX_ROUND_TRIPS, Orchestrator, SessionState};
use crate::Error;
use crate::conversation::Transcript;
use crate::model_client::ModelClient;
use crate::tool::{AnyTool, Catalog, Tool, ToolObject};

/// [`Orchestrator`] builder.
pub struct OrchestratorBuilder {
    model_client: ModelClient,
    policy: String,
    tools: Vec<Box<dyn ToolObject>>,
    max_round_trips: usize,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            policy: String::new(),
            tools: vec![],
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
        }
    }

    /// Sets the policy text, sent as the system turn of every request.
    #[inline]
    pub fn with_policy<S: Into<String>>(mut self, policy: S) -> Self {
        self.policy = policy.into();
        self
    }

    /// Registers an action tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Caps the number of model calls for a single message. Values below
    /// one are raised to one.
    #[inline]
    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.max_round_trips = max_round_trips.max(1);
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidCatalog`] if a tool is registered
    /// twice, takes the name of a control tool, or has a parameter schema
    /// that is not a closed object.
    ///
    /// [`ErrorKind::InvalidCatalog`]: crate::ErrorKind::InvalidCatalog
    pub fn build(self) -> Result<Orchestrator, Error> {
        let catalog = Catalog::with_tools(self.tools)?;
        Ok(Orchestrator {
            model_client: self.model_client,
            catalog,
            transcript: Transcript::new(self.policy),
            state: SessionState::Idle,
            max_round_trips: self.max_round_trips,
        })
    }
}
