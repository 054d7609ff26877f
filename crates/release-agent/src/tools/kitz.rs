use std::future::ready;

use chrono::NaiveDate;
use release_agent_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

const DATE_FORMAT: &str = "%d/%m/%y";

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateKitzParameters {
    #[schemars(
        description = "Description of the problem that this KITZ object is trying to solve."
    )]
    problem: Option<String>,
    #[schemars(description = "Description of the benefits of solving.")]
    benefit: Option<String>,
    #[schemars(description = "Description of the change itself.")]
    solution: String,
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(
        with = "String",
        description = "Target delivery date for the change in DD/MM/YY format."
    )]
    delivery_date: NaiveDate,
}

fn deserialize_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|err| {
        D::Error::custom(format!(
            "`{raw}` is not a DD/MM/YY delivery date: {err}"
        ))
    })
}

/// A newly created change object (KITZ).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Kitz {
    /// Identifier of the change object.
    pub id: Uuid,
    /// The problem being solved, empty if not given.
    pub problem: String,
    /// The benefits of solving it, empty if not given.
    pub benefit: String,
    /// Description of the change itself.
    pub solution: String,
    /// Target delivery date in DD/MM/YY format.
    pub delivery_date: String,
}

/// A tool for creating change objects attached to a change context.
pub struct CreateKitzTool {
    parameter_schema: Value,
}

impl CreateKitzTool {
    /// Creates a new KITZ tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<CreateKitzParameters>(),
        }
    }
}

impl Default for CreateKitzTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CreateKitzTool {
    type Input = CreateKitzParameters;
    type Output = Kitz;

    fn name(&self) -> &str {
        "create_kitz"
    }

    fn description(&self) -> &str {
        "Creates a Change Object (KITZ) associated to a previously created Change Context"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: CreateKitzParameters,
    ) -> impl Future<Output = ToolResult<Kitz>> + Send + 'static {
        let kitz = Kitz {
            id: Uuid::new_v4(),
            problem: input.problem.unwrap_or_default(),
            benefit: input.benefit.unwrap_or_default(),
            solution: input.solution,
            delivery_date: input.delivery_date.format(DATE_FORMAT).to_string(),
        };
        debug!("created KITZ {} due {}", kitz.id, kitz.delivery_date);
        ready(Ok(kitz))
    }
}
