use std::future::ready;

use release_agent_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateChangeContextParameters {
    #[schemars(
        description = "Change context title with high-level description of the change."
    )]
    title: String,
    #[schemars(
        description = "The Modul Org (department) responsible for the car component affected by the change."
    )]
    module_org: String,
    #[schemars(
        description = "The derivative (car component) affected by the change."
    )]
    derivative: String,
}

/// A newly created change context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeContext {
    /// Identifier of the change context.
    pub id: Uuid,
    /// High-level description of the change.
    pub title: String,
    /// Department responsible for the affected component.
    pub module_org: String,
    /// The affected car component.
    pub derivative: String,
}

/// A tool for creating change contexts.
pub struct CreateChangeContextTool {
    parameter_schema: Value,
}

impl CreateChangeContextTool {
    /// Creates a new change context tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<CreateChangeContextParameters>(),
        }
    }
}

impl Default for CreateChangeContextTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CreateChangeContextTool {
    type Input = CreateChangeContextParameters;
    type Output = ChangeContext;

    fn name(&self) -> &str {
        "create_change_context"
    }

    fn description(&self) -> &str {
        "Creates a change context"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: CreateChangeContextParameters,
    ) -> impl Future<Output = ToolResult<ChangeContext>> + Send + 'static {
        let context = ChangeContext {
            id: Uuid::new_v4(),
            title: input.title,
            module_org: input.module_org,
            derivative: input.derivative,
        };
        debug!("created change context {}", context.id);
        ready(Ok(context))
    }
}
