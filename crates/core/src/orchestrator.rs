mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::mem;

use release_agent_model::{ModelRequest, SamplingOptions, ToolCallRequest};
use tracing::Instrument;

use crate::Error;
use crate::conversation::Transcript;
use crate::model_client::ModelClient;
use crate::tool::{
    AskClarificationArgs, Catalog, ControlTool, Entry, StartOverArgs,
    parse_arguments,
};
pub use builder::OrchestratorBuilder;
pub use state::SessionState;

/// The text returned after the model starts the conversation over.
pub const RESET_ACK: &str = "Let's start over";

/// Default cap on model calls within one `respond` invocation.
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 8;

/// A chat session driving the model through tool calls.
///
/// Each session owns its transcript. `respond` takes `&mut self`, so a
/// session handles one message at a time; run several sessions side by
/// side by creating several orchestrators.
pub struct Orchestrator {
    model_client: ModelClient,
    catalog: Catalog,
    transcript: Transcript,
    state: SessionState,
    max_round_trips: usize,
}

/// What to do after a model reply has been dispatched.
enum Step {
    Reply(String),
    CallModel,
}

impl Orchestrator {
    /// Turns one user message into one message for the user.
    ///
    /// The model may call action tools in between; their results are fed
    /// back and the model is called again until it produces something for
    /// the user, up to the configured number of round-trips.
    ///
    /// # Errors
    ///
    /// Every error is fatal for this call. Turns appended before the
    /// failure stay in the transcript. A failed tool call is answered with
    /// an error result when the next message arrives.
    pub async fn respond<S: Into<String>>(
        &mut self,
        message: S,
    ) -> Result<String, Error> {
        let span = debug_span!("respond", turns = self.transcript.len());
        self.run(message.into()).instrument(span).await
    }

    /// Returns the transcript of this session.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns what the session is waiting for.
    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    async fn run(&mut self, message: String) -> Result<String, Error> {
        mem::take(&mut self.state).append_input(&mut self.transcript, message)?;

        for round_trip in 1..=self.max_round_trips {
            debug!("calling model ({round_trip}/{})", self.max_round_trips);
            let (text, tool_call) = self.call_model().await?;
            let step = match tool_call {
                None => Step::Reply(text.unwrap_or_default()),
                Some(call) => {
                    let last_round = round_trip == self.max_round_trips;
                    self.dispatch(call, last_round).await?
                }
            };
            match step {
                Step::Reply(text) => return Ok(text),
                Step::CallModel => continue,
            }
        }

        warn!("giving up after {} round-trips", self.max_round_trips);
        Err(Error::RoundTripLimit(self.max_round_trips))
    }

    /// Sends the transcript to the model and records the reply.
    async fn call_model(
        &mut self,
    ) -> Result<(Option<String>, Option<ToolCallRequest>), Error> {
        let request = ModelRequest {
            messages: self.transcript.to_messages(),
            tools: self.catalog.definitions().to_vec(),
            options: SamplingOptions::DETERMINISTIC,
        };
        let mut reply = self
            .model_client
            .send_request(request)
            .await
            .map_err(Error::Provider)?;

        // Parallel tool calls are disabled in the request. A reply that
        // carries several anyway is dropped before it reaches the transcript.
        if reply.tool_calls.len() > 1 {
            return Err(Error::TooManyToolCalls(reply.tool_calls.len()));
        }
        let tool_call = reply.tool_calls.pop();
        self.transcript
            .push_assistant(reply.text.clone(), tool_call.clone());
        Ok((reply.text, tool_call))
    }

    /// Runs the tool call carried by the last assistant turn.
    ///
    /// On the last round an action is not run, since its result could not
    /// be sent back to the model.
    async fn dispatch(
        &mut self,
        call: ToolCallRequest,
        last_round: bool,
    ) -> Result<Step, Error> {
        let Some(entry) = self.catalog.resolve(&call.name) else {
            error!("model requested unknown tool `{}`", call.name);
            self.state = SessionState::Unanswered {
                call_id: call.id,
                reason: format!("unknown tool `{}`", call.name),
            };
            return Err(Error::UnknownTool(call.name));
        };

        match entry {
            Entry::Control(ControlTool::StartOver) => {
                self.parse_control::<StartOverArgs>(&call)?;
                debug!("starting over");
                self.transcript.reset();
                self.state = SessionState::Idle;
                Ok(Step::Reply(RESET_ACK.to_owned()))
            }
            Entry::Control(ControlTool::AskClarification) => {
                let args = self.parse_control::<AskClarificationArgs>(&call)?;
                debug!("asking for clarification ({})", call.id);
                self.state =
                    SessionState::AwaitingClarification { call_id: call.id };
                Ok(Step::Reply(args.prompt))
            }
            Entry::Action(_) if last_round => {
                warn!(
                    "not running tool `{}` ({}): round-trip limit reached",
                    call.name, call.id
                );
                self.state = SessionState::Unanswered {
                    call_id: call.id,
                    reason: format!(
                        "tool `{}` was not run: round-trip limit reached",
                        call.name
                    ),
                };
                Err(Error::RoundTripLimit(self.max_round_trips))
            }
            Entry::Action(tool) => {
                debug!("running tool `{}` ({})", call.name, call.id);
                trace!("arguments: {}", call.arguments);

                // Stays unanswered until the result is recorded, including
                // when this future is dropped while the tool runs.
                self.state = SessionState::Unanswered {
                    call_id: call.id.clone(),
                    reason: format!("tool `{}` did not complete", call.name),
                };

                let fut = match tool.execute(&call.arguments) {
                    Ok(fut) => fut,
                    Err(err) => {
                        return Err(self.fail_call(
                            &call,
                            Error::Schema {
                                tool: call.name.clone(),
                                reason: err.reason().into_owned(),
                            },
                        ));
                    }
                };
                let output = match fut.await {
                    Ok(output) => output,
                    Err(err) => {
                        return Err(self.fail_call(
                            &call,
                            Error::Handler {
                                tool: call.name.clone(),
                                source: err,
                            },
                        ));
                    }
                };

                trace!("tool `{}` returned: {output}", call.name);
                self.transcript
                    .push_tool_result(call.id, output.to_string())?;
                self.state = SessionState::Idle;
                Ok(Step::CallModel)
            }
        }
    }

    fn parse_control<T: serde::de::DeserializeOwned>(
        &mut self,
        call: &ToolCallRequest,
    ) -> Result<T, Error> {
        parse_arguments(&call.arguments).map_err(|err| {
            self.fail_call(
                call,
                Error::Schema {
                    tool: call.name.clone(),
                    reason: err.reason().into_owned(),
                },
            )
        })
    }

    /// Marks the call as failed so that the next input answers it.
    fn fail_call(&mut self, call: &ToolCallRequest, err: Error) -> Error {
        error!("tool call {} failed: {err}", call.id);
        self.state = SessionState::Unanswered {
            call_id: call.id.clone(),
            reason: err.to_string(),
        };
        err
    }
}
