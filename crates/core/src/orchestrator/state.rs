use serde_json::json;

use crate::Error;
use crate::conversation::Transcript;

/// What the session is waiting for between two `respond` calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The next input is a regular user message.
    #[default]
    Idle,
    /// The model asked the user a question; the next input answers the
    /// `ask_clarification` call with this identifier.
    AwaitingClarification {
        /// Identifier of the pending `ask_clarification` call.
        call_id: String,
    },
    /// A tool call failed before it could be answered. The next input first
    /// closes the call with an error result, so the provider never sees a
    /// dangling call.
    Unanswered {
        /// Identifier of the failed call.
        call_id: String,
        /// Error text reported back to the model.
        reason: String,
    },
}

impl SessionState {
    /// Appends the turns for an incoming message, consuming the state.
    pub(super) fn append_input(
        self,
        transcript: &mut Transcript,
        message: String,
    ) -> Result<(), Error> {
        match self {
            SessionState::Idle => {
                transcript.push_user(message);
            }
            SessionState::AwaitingClarification { call_id } => {
                trace!("answering clarification {call_id}");
                transcript.push_tool_result(call_id, message)?;
            }
            SessionState::Unanswered { call_id, reason } => {
                debug!("closing failed tool call {call_id}: {reason}");
                let content = json!({ "error": reason }).to_string();
                transcript.push_tool_result(call_id, content)?;
                transcript.push_user(message);
            }
        }
        Ok(())
    }
}
