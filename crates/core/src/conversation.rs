//! Conversation-related types.

use release_agent_model::{ModelMessage, ToolCallRequest, ToolCallResult};

use crate::Error;

/// A single entry of the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    /// The policy document, always the first turn.
    Policy(String),
    /// A message typed by the user.
    User(String),
    /// A reply from the model.
    Assistant {
        /// Text content, if any.
        content: Option<String>,
        /// The single tool call requested in this reply, if any.
        tool_call: Option<ToolCallRequest>,
    },
    /// The answer to a tool call, correlated by the call identifier.
    ToolResult {
        /// Identifier of the tool call this turn answers.
        call_id: String,
        /// Serialized result payload.
        content: String,
    },
}

impl Turn {
    /// Returns the pending tool call if this is an assistant turn carrying
    /// one.
    #[inline]
    pub fn tool_call(&self) -> Option<&ToolCallRequest> {
        match self {
            Turn::Assistant { tool_call, .. } => tool_call.as_ref(),
            _ => None,
        }
    }

    fn to_message(&self) -> ModelMessage {
        match self {
            Turn::Policy(text) => ModelMessage::System(text.clone()),
            Turn::User(text) => ModelMessage::User(text.clone()),
            Turn::Assistant { content, tool_call } => ModelMessage::Assistant {
                content: content.clone(),
                tool_call: tool_call.clone(),
            },
            Turn::ToolResult { call_id, content } => {
                ModelMessage::Tool(ToolCallResult {
                    id: call_id.clone(),
                    content: content.clone(),
                })
            }
        }
    }
}

/// The ordered history of a chat session.
///
/// The first turn is always the policy turn. It is set on construction and
/// survives resets; everything else is append-only until the next reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates a transcript holding only the policy turn.
    #[inline]
    pub fn new<S: Into<String>>(policy: S) -> Self {
        Self {
            turns: vec![Turn::Policy(policy.into())],
        }
    }

    /// Returns all turns, the policy turn included.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns, the policy turn included.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always `false`, the policy turn is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the policy document.
    #[inline]
    pub fn policy(&self) -> &str {
        match &self.turns[0] {
            Turn::Policy(text) => text,
            _ => unreachable!("the first turn is always the policy"),
        }
    }

    /// Returns the last turn.
    #[inline]
    pub fn last(&self) -> &Turn {
        // The policy turn guarantees at least one element.
        &self.turns[self.turns.len() - 1]
    }

    pub(crate) fn push_user(&mut self, text: String) {
        self.turns.push(Turn::User(text));
    }

    pub(crate) fn push_assistant(
        &mut self,
        content: Option<String>,
        tool_call: Option<ToolCallRequest>,
    ) {
        self.turns.push(Turn::Assistant { content, tool_call });
    }

    /// Appends a tool result. It must answer the tool call carried by the
    /// assistant turn right before it.
    pub(crate) fn push_tool_result(
        &mut self,
        call_id: String,
        content: String,
    ) -> Result<(), Error> {
        match self.last().tool_call() {
            Some(call) if call.id == call_id => {}
            _ => {
                return Err(Error::Internal(format!(
                    "tool result `{call_id}` does not answer the previous turn"
                )));
            }
        }
        self.turns.push(Turn::ToolResult { call_id, content });
        Ok(())
    }

    /// Drops everything but the policy turn.
    pub(crate) fn reset(&mut self) {
        self.turns.truncate(1);
    }

    pub(crate) fn to_messages(&self) -> Vec<ModelMessage> {
        self.turns.iter().map(Turn::to_message).collect()
    }
}
