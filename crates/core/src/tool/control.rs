use release_agent_model::ModelTool;
use schemars::JsonSchema;
use serde::Deserialize;

use super::parameter_schema;

/// Tools interpreted by the orchestrator itself instead of a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlTool {
    /// Drops the conversation and starts a new release.
    StartOver,
    /// Hands a question back to the user and waits for the answer.
    AskClarification,
}

/// Arguments of `start_over`.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StartOverArgs {}

/// Arguments of `ask_clarification`.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AskClarificationArgs {
    /// The question shown to the user.
    #[schemars(description = "The prompt to ask the customer.")]
    pub prompt: String,
}

impl ControlTool {
    /// All control tools, in catalog order.
    pub const ALL: [ControlTool; 2] =
        [ControlTool::StartOver, ControlTool::AskClarification];

    /// Returns the tool name advertised to the model.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            ControlTool::StartOver => "start_over",
            ControlTool::AskClarification => "ask_clarification",
        }
    }

    /// Looks up a control tool by name.
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ControlTool::StartOver => {
                "Starts a new process to create a release for the user"
            }
            ControlTool::AskClarification => {
                "Prompts the customer for clarification on their request."
            }
        }
    }

    /// Returns the catalog entry of this tool.
    pub fn definition(self) -> ModelTool {
        let parameters = match self {
            ControlTool::StartOver => parameter_schema::<StartOverArgs>(),
            ControlTool::AskClarification => {
                parameter_schema::<AskClarificationArgs>()
            }
        };
        ModelTool {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters,
        }
    }
}
