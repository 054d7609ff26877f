use std::error::Error as StdError;
use std::fmt::{self, Display};

use release_agent_model::ModelProviderError;

use crate::tool::Error as ToolError;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The completion provider failed.
    Provider,
    /// Tool call arguments don't match the tool's parameter schema.
    Schema,
    /// The model asked for a tool that is not in the catalog.
    UnknownTool,
    /// An action handler failed.
    Handler,
    /// The model asked for more than one tool call in a single reply.
    TooManyToolCalls,
    /// The model kept calling tools past the round-trip limit.
    RoundTripLimit,
    /// The tool catalog could not be assembled.
    InvalidCatalog,
    /// Internal state is inconsistent.
    Internal,
}

/// The error returned by [`Orchestrator::respond`] and the builder.
///
/// Every variant is fatal for the current call; nothing is retried.
///
/// [`Orchestrator::respond`]: crate::Orchestrator::respond
#[derive(Debug)]
pub enum Error {
    /// The completion provider failed.
    Provider(Box<dyn ModelProviderError>),
    /// Tool call arguments don't match the tool's parameter schema.
    Schema {
        /// Name of the tool.
        tool: String,
        /// Why the arguments were rejected.
        reason: String,
    },
    /// The model asked for a tool that is not in the catalog.
    UnknownTool(String),
    /// An action handler failed.
    Handler {
        /// Name of the tool.
        tool: String,
        /// The error from the handler.
        source: ToolError,
    },
    /// The model asked for more than one tool call in a single reply.
    TooManyToolCalls(usize),
    /// The model kept calling tools past the round-trip limit.
    RoundTripLimit(usize),
    /// The tool catalog could not be assembled.
    InvalidCatalog(String),
    /// Internal state is inconsistent.
    Internal(String),
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Provider(_) => ErrorKind::Provider,
            Error::Schema { .. } => ErrorKind::Schema,
            Error::UnknownTool(_) => ErrorKind::UnknownTool,
            Error::Handler { .. } => ErrorKind::Handler,
            Error::TooManyToolCalls(_) => ErrorKind::TooManyToolCalls,
            Error::RoundTripLimit(_) => ErrorKind::RoundTripLimit,
            Error::InvalidCatalog(_) => ErrorKind::InvalidCatalog,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(err) => {
                write!(f, "completion provider failed ({}): {err}", err.kind())
            }
            Error::Schema { tool, reason } => {
                write!(f, "invalid arguments for `{tool}`: {reason}")
            }
            Error::UnknownTool(name) => write!(f, "unknown tool `{name}`"),
            Error::Handler { tool, source } => {
                write!(f, "tool `{tool}` failed: {}", source.reason())
            }
            Error::TooManyToolCalls(count) => {
                write!(f, "model requested {count} tool calls in one reply")
            }
            Error::RoundTripLimit(limit) => {
                write!(f, "no answer after {limit} model round-trips")
            }
            Error::InvalidCatalog(reason) => {
                write!(f, "invalid tool catalog: {reason}")
            }
            Error::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Provider(err) => Some(&**err),
            Error::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}
