//! Tool call supports.

mod catalog;
mod control;
mod error;

use std::pin::Pin;

use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) use catalog::{Catalog, Entry};
pub use control::{AskClarificationArgs, ControlTool, StartOverArgs};
pub use error::{Error, ErrorKind};

/// The result of a tool call.
pub type ToolResult<T> = Result<T, Error>;

/// A side-effecting action the model can invoke.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as a backend client. To do this,
/// make the context an immutable state of the tool, which can be set during
/// initialization, and copy it when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    ///
    /// Arguments from the model are deserialized into this type before the
    /// tool runs; a mismatch never reaches [`Tool::execute`].
    type Input: DeserializeOwned;

    /// The structured result handed back to the model.
    type Output: Serialize + Send + 'static;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    ///
    /// The schema must describe a JSON object. See [`parameter_schema`] for
    /// deriving one from `Self::Input`.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult<Self::Output>> + Send + 'static;
}

/// Derives a parameter schema from an argument type.
///
/// Argument types should use `#[serde(deny_unknown_fields)]`, so that the
/// schema is closed and the deserializer agrees with it.
pub fn parameter_schema<T: JsonSchema>() -> Value {
    let mut schema = schema_for!(T).to_value();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }
    schema
}

/// Parses raw tool call arguments into a typed value.
///
/// Some models send an empty string for tools without parameters, which is
/// read as an empty object.
pub fn parse_arguments<T: DeserializeOwned>(raw: &str) -> ToolResult<T> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "{}" } else { raw };
    serde_json::from_str(raw)
        .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))
}

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Value>> + Send>>;

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    /// Validates the raw arguments and returns the pending execution.
    fn execute(&self, arguments: &str) -> ToolResult<ToolFuture>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(&self, arguments: &str) -> ToolResult<ToolFuture> {
        let input: T::Input = parse_arguments(arguments)?;
        let fut = self.0.execute(input);
        Ok(Box::pin(async move {
            let output = fut.await?;
            serde_json::to_value(output).map_err(|err| {
                Error::execution_error().with_reason(format!("{err}"))
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct EchoArgs {
        text: String,
        times: Option<u32>,
    }

    struct EchoTool {
        schema: Value,
    }

    impl Tool for EchoTool {
        type Input = EchoArgs;
        type Output = Vec<String>;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats text."
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: EchoArgs,
        ) -> impl Future<Output = ToolResult<Vec<String>>> + Send + 'static
        {
            let times = input.times.unwrap_or(1) as usize;
            ready(Ok(vec![input.text; times]))
        }
    }

    fn echo_tool() -> AnyTool<EchoTool> {
        AnyTool(EchoTool {
            schema: parameter_schema::<EchoArgs>(),
        })
    }

    #[test]
    fn test_parameter_schema() {
        let schema = parameter_schema::<EchoArgs>();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["text"]));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_parse_arguments() {
        let args: EchoArgs = parse_arguments(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(args.text, "hi");
        assert!(args.times.is_none());

        let err = parse_arguments::<EchoArgs>(r#"{"times":2}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = parse_arguments::<EchoArgs>(r#"{"text":"a","x":1}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = parse_arguments::<EchoArgs>("{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_arguments_are_an_empty_object() {
        assert!(parse_arguments::<StartOverArgs>("").is_ok());
        assert!(parse_arguments::<StartOverArgs>("  ").is_ok());
        assert!(parse_arguments::<StartOverArgs>(r#"{"now":true}"#).is_err());
    }

    #[tokio::test]
    async fn test_execute_serializes_output() {
        let tool = echo_tool();
        let output = tool
            .execute(r#"{"text":"hi","times":2}"#)
            .unwrap()
            .await
            .unwrap();
        assert_eq!(output, json!(["hi", "hi"]));
    }

    #[test]
    fn test_invalid_input_never_runs() {
        let tool = echo_tool();
        let err = tool.execute(r#"{"text":1}"#).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
