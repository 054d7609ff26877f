use release_agent_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchPreviousKmnrsParameters {
    #[schemars(description = "Search query.")]
    search_query: String,
}

/// A previously completed change (KMNR).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Kmnr {
    /// Identifier of the change.
    pub id: Uuid,
    /// Department responsible for the affected component.
    pub module_org: String,
    /// The affected car component.
    pub derivative: String,
    /// High-level description of the change.
    pub title: String,
}

const REFERENCE_CHANGES: [(&str, &str, &str); 3] = [
    ("KE02", "X12", "New mirror cap variant for the X12"),
    ("FE04", "R44", "Door hinge issues on R44"),
    ("KU12", "F44", "Steering wheel position"),
];

/// A tool for looking up completed changes to use as a reference.
///
/// The search backend is not connected yet; every query yields the same
/// reference changes.
pub struct SearchPreviousKmnrsTool {
    parameter_schema: Value,
}

impl SearchPreviousKmnrsTool {
    /// Creates a new search tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<SearchPreviousKmnrsParameters>(
            ),
        }
    }
}

impl Default for SearchPreviousKmnrsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SearchPreviousKmnrsTool {
    type Input = SearchPreviousKmnrsParameters;
    type Output = Vec<Kmnr>;

    fn name(&self) -> &str {
        "search_previous_kmnrs"
    }

    fn description(&self) -> &str {
        "Searches for previously completed Changes (KMNRs) to use as reference for new Change Contexts / Change Objects (KITZ)"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchPreviousKmnrsParameters,
    ) -> impl Future<Output = ToolResult<Vec<Kmnr>>> + Send + 'static {
        async move {
            debug!("searching KMNRs for {:?}", input.search_query);
            let results = REFERENCE_CHANGES
                .iter()
                .map(|&(module_org, derivative, title)| Kmnr {
                    id: Uuid::new_v4(),
                    module_org: module_org.to_owned(),
                    derivative: derivative.to_owned(),
                    title: title.to_owned(),
                })
                .collect();
            Ok(results)
        }
    }
}
