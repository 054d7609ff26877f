use serde_json::Value;

use crate::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Sampling parameters.
    pub options: SamplingOptions,
}

/// Sampling parameters of a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingOptions {
    /// Sampling temperature, `0.0` being the most deterministic.
    pub temperature: f32,
    /// Whether the model may request more than one tool call in a single
    /// response.
    pub parallel_tool_calls: bool,
}

impl SamplingOptions {
    /// Deterministic sampling with at most one tool call per response.
    pub const DETERMINISTIC: Self = Self {
        temperature: 0.0,
        parallel_tool_calls: false,
    };
}

impl Default for SamplingOptions {
    #[inline]
    fn default() -> Self {
        Self::DETERMINISTIC
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// A message previously produced by the model.
    Assistant {
        /// Text content, if any.
        content: Option<String>,
        /// The tool call the model requested, if any.
        tool_call: Option<ToolCallRequest>,
    },
    /// A tool call result.
    Tool(ToolCallResult),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
