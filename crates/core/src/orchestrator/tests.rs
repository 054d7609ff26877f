use std::future::{pending, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use release_agent_model::{ModelMessage, ToolCallRequest};
use release_agent_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::timeout;

use crate::conversation::Turn;
use crate::tool::{self, Tool, ToolResult};
use crate::{
    ErrorKind, Orchestrator, OrchestratorBuilder, RESET_ACK, SessionState,
};

const POLICY: &str = "Follow the release policy.";

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ChangeContextArgs {
    title: String,
    module_org: String,
    derivative: String,
}

/// Counts invocations and optionally fails them.
struct CountingTool {
    calls: Arc<AtomicUsize>,
    fail: bool,
    schema: Value,
}

impl CountingTool {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            fail: false,
            schema: tool::parameter_schema::<ChangeContextArgs>(),
        }
    }

    fn failing(calls: Arc<AtomicUsize>) -> Self {
        Self {
            fail: true,
            ..Self::new(calls)
        }
    }
}

impl Tool for CountingTool {
    type Input = ChangeContextArgs;
    type Output = Value;

    fn name(&self) -> &str {
        "create_change_context"
    }

    fn description(&self) -> &str {
        "Creates a change context."
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: ChangeContextArgs,
    ) -> impl Future<Output = ToolResult<Value>> + Send + 'static {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return ready(Err(tool::Error::execution_error()
                .with_reason("backend unavailable")));
        }
        ready(Ok(json!({
            "change_context_id": "cc-1",
            "title": input.title,
            "module_org": input.module_org,
            "derivative": input.derivative,
        })))
    }
}

const CHANGE_CONTEXT_ARGS: &str = r#"{"title":"New color for R22 mirror cap","module_org":"?","derivative":"R22"}"#;

fn orchestrator(
    provider: &TestModelProvider,
    calls: &Arc<AtomicUsize>,
) -> Orchestrator {
    OrchestratorBuilder::with_model_provider(provider.clone())
        .with_policy(POLICY)
        .with_tool(CountingTool::new(calls.clone()))
        .build()
        .unwrap()
}

fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments: arguments.to_owned(),
    }
}

#[tokio::test]
async fn test_create_change_context_scenario() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        CHANGE_CONTEXT_ARGS,
    ));
    provider.add_response(PresetResponse::text("Created change context cc-1"));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let reply = orchestrator
        .respond("New color for the R22 mirror cap")
        .await
        .unwrap();
    assert_eq!(reply, "Created change context cc-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.state(), &SessionState::Idle);

    let turns = orchestrator.transcript().turns();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[0], Turn::Policy(POLICY.to_owned()));
    assert_eq!(
        turns[1],
        Turn::User("New color for the R22 mirror cap".to_owned())
    );
    assert_eq!(
        turns[2].tool_call(),
        Some(&tool_call("call_1", "create_change_context", CHANGE_CONTEXT_ARGS))
    );
    let Turn::ToolResult { call_id, content } = &turns[3] else {
        panic!("expected a tool result, got {:?}", turns[3]);
    };
    assert_eq!(call_id, "call_1");
    let content: Value = serde_json::from_str(content).unwrap();
    assert_eq!(content["derivative"], "R22");
    assert_eq!(content["change_context_id"], "cc-1");
    assert_eq!(
        turns[4],
        Turn::Assistant {
            content: Some("Created change context cc-1".to_owned()),
            tool_call: None,
        }
    );

    // The second request carries the tool result.
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[1].messages.len(), 4);
    assert!(matches!(
        &requests[1].messages[3],
        ModelMessage::Tool(result) if result.id == "call_1"
    ));
}

#[tokio::test]
async fn test_requests_are_deterministic() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Hello"));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    orchestrator.respond("Hi").await.unwrap();

    let request = &provider.requests()[0];
    assert_eq!(request.options.temperature, 0.0);
    assert!(!request.options.parallel_tool_calls);
    assert_eq!(request.messages[0], ModelMessage::System(POLICY.to_owned()));
    let names: Vec<_> = request.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["start_over", "ask_clarification", "create_change_context"]
    );
}

#[tokio::test]
async fn test_plain_replies() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Which ".to_owned()),
        PresetEvent::MessageDelta("derivative?".to_owned()),
    ]));
    provider.add_response(PresetResponse::text("Got it."));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    assert_eq!(orchestrator.respond("Hi").await.unwrap(), "Which derivative?");
    assert_eq!(orchestrator.transcript().len(), 3);
    assert_eq!(orchestrator.respond("R22").await.unwrap(), "Got it.");
    assert_eq!(orchestrator.transcript().len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_reply_is_empty_text() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([]));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    assert_eq!(orchestrator.respond("Hi").await.unwrap(), "");
}

#[tokio::test]
async fn test_start_over() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Which derivative?"));
    provider.add_response(PresetResponse::tool_call("call_1", "start_over", "{}"));
    provider.add_response(PresetResponse::tool_call("call_2", "start_over", ""));
    provider.add_response(PresetResponse::text("Hello again"));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    orchestrator.respond("New mirror cap").await.unwrap();
    assert_eq!(orchestrator.respond("Start over").await.unwrap(), RESET_ACK);
    assert_eq!(orchestrator.transcript().len(), 1);
    let after_first = orchestrator.transcript().clone();

    assert_eq!(orchestrator.respond("Again").await.unwrap(), RESET_ACK);
    assert_eq!(orchestrator.transcript(), &after_first);
    assert_eq!(orchestrator.transcript().policy(), POLICY);
    assert_eq!(orchestrator.state(), &SessionState::Idle);

    // The conversation continues from the policy alone.
    assert_eq!(orchestrator.respond("Hi").await.unwrap(), "Hello again");
    let request = provider.requests().pop().unwrap();
    assert_eq!(
        request.messages,
        [
            ModelMessage::System(POLICY.to_owned()),
            ModelMessage::User("Hi".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_clarification() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "ask_clarification",
        r#"{"prompt":"Which module organization?"}"#,
    ));
    provider.add_response(PresetResponse::text("Thanks."));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let reply = orchestrator.respond("New mirror cap").await.unwrap();
    assert_eq!(reply, "Which module organization?");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        orchestrator.state(),
        &SessionState::AwaitingClarification {
            call_id: "call_1".to_owned()
        }
    );
    assert_eq!(
        orchestrator.transcript().last().tool_call().map(|c| c.id.as_str()),
        Some("call_1")
    );

    orchestrator.respond("KE02").await.unwrap();
    let turns = orchestrator.transcript().turns();
    assert_eq!(
        turns[3],
        Turn::ToolResult {
            call_id: "call_1".to_owned(),
            content: "KE02".to_owned(),
        }
    );
    assert!(!turns.iter().any(|turn| *turn == Turn::User("KE02".to_owned())));
    assert_eq!(orchestrator.state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_unknown_tool() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call("call_1", "read_file", "{}"));
    provider.add_response(PresetResponse::text("Sorry."));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let err = orchestrator.respond("Hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownTool);
    assert!(
        !orchestrator
            .transcript()
            .turns()
            .iter()
            .any(|turn| matches!(turn, Turn::ToolResult { .. }))
    );
    assert_eq!(orchestrator.transcript().len(), 3);

    // The dangling call is closed before the next message.
    orchestrator.respond("Try again").await.unwrap();
    let turns = orchestrator.transcript().turns();
    let Turn::ToolResult { call_id, content } = &turns[3] else {
        panic!("expected a tool result, got {:?}", turns[3]);
    };
    assert_eq!(call_id, "call_1");
    let content: Value = serde_json::from_str(content).unwrap();
    assert!(content["error"].as_str().unwrap().contains("read_file"));
    assert_eq!(turns[4], Turn::User("Try again".to_owned()));
}

#[tokio::test]
async fn test_handler_failure() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        CHANGE_CONTEXT_ARGS,
    ));
    provider.add_response(PresetResponse::text("The backend is down."));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone())
            .with_policy(POLICY)
            .with_tool(CountingTool::failing(calls.clone()))
            .build()
            .unwrap();

    let err = orchestrator.respond("New mirror cap").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Handler);
    assert!(err.to_string().contains("backend unavailable"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.transcript().len(), 3);
    assert!(matches!(
        orchestrator.state(),
        SessionState::Unanswered { call_id, .. } if call_id == "call_1"
    ));

    let reply = orchestrator.respond("What happened?").await.unwrap();
    assert_eq!(reply, "The backend is down.");
    let turns = orchestrator.transcript().turns();
    assert!(matches!(
        &turns[3],
        Turn::ToolResult { call_id, content }
            if call_id == "call_1" && content.contains("backend unavailable")
    ));
    assert_eq!(turns[4], Turn::User("What happened?".to_owned()));
}

#[tokio::test]
async fn test_schema_mismatch_never_runs_handler() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        r#"{"title":"Mirror cap"}"#,
    ));
    provider.add_response(PresetResponse::tool_call(
        "call_2",
        "ask_clarification",
        r#"{"question":"?"}"#,
    ));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let err = orchestrator.respond("New mirror cap").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let err = orchestrator.respond("Well?").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(matches!(
        orchestrator.state(),
        SessionState::Unanswered { call_id, .. } if call_id == "call_2"
    ));
}

#[tokio::test]
async fn test_too_many_tool_calls() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::ToolCall(tool_call(
            "call_1",
            "create_change_context",
            CHANGE_CONTEXT_ARGS,
        )),
        PresetEvent::ToolCall(tool_call("call_2", "start_over", "{}")),
    ]));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let err = orchestrator.respond("Hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyToolCalls);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(orchestrator.transcript().len(), 2);
    assert_eq!(orchestrator.state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_round_trip_limit() {
    let provider = TestModelProvider::default();
    for i in 0..3 {
        provider.add_response(PresetResponse::tool_call(
            format!("call_{i}"),
            "create_change_context",
            CHANGE_CONTEXT_ARGS,
        ));
    }
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone())
            .with_policy(POLICY)
            .with_tool(CountingTool::new(calls.clone()))
            .with_max_round_trips(2)
            .build()
            .unwrap();

    let err = orchestrator.respond("Loop").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RoundTripLimit);
    // The call of the last round has nowhere to go and is not run.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.requests().len(), 2);
    assert_eq!(provider.remaining(), 1);
    assert!(matches!(
        orchestrator.state(),
        SessionState::Unanswered { call_id, .. } if call_id == "call_1"
    ));
    let last_call = orchestrator.transcript().last().tool_call().unwrap();
    assert_eq!(last_call.id, "call_1");
}

#[tokio::test]
async fn test_single_round_trip_never_runs_actions() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        CHANGE_CONTEXT_ARGS,
    ));
    provider.add_response(PresetResponse::text("Let me try again."));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone())
            .with_policy(POLICY)
            .with_tool(CountingTool::new(calls.clone()))
            .with_max_round_trips(1)
            .build()
            .unwrap();

    let err = orchestrator.respond("New mirror cap").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RoundTripLimit);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.requests().len(), 1);

    let reply = orchestrator.respond("Well?").await.unwrap();
    assert_eq!(reply, "Let me try again.");
    let turns = orchestrator.transcript().turns();
    let Turn::ToolResult { call_id, content } = &turns[3] else {
        panic!("expected a tool result, got {:?}", turns[3]);
    };
    assert_eq!(call_id, "call_1");
    let content: Value = serde_json::from_str(content).unwrap();
    assert!(content["error"].as_str().unwrap().contains("not run"));
    assert_eq!(turns[4], Turn::User("Well?".to_owned()));
}

/// Never finishes.
struct StuckTool(Value);

impl Tool for StuckTool {
    type Input = ChangeContextArgs;
    type Output = Value;

    fn name(&self) -> &str {
        "create_change_context"
    }

    fn description(&self) -> &str {
        "Creates a change context."
    }

    fn parameter_schema(&self) -> &Value {
        &self.0
    }

    fn execute(
        &self,
        _input: ChangeContextArgs,
    ) -> impl Future<Output = ToolResult<Value>> + Send + 'static {
        pending()
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropped_respond_leaves_call_unanswered() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        CHANGE_CONTEXT_ARGS,
    ));
    provider.add_response(PresetResponse::text("That took too long."));
    let mut orchestrator =
        OrchestratorBuilder::with_model_provider(provider.clone())
            .with_policy(POLICY)
            .with_tool(StuckTool(tool::parameter_schema::<ChangeContextArgs>()))
            .build()
            .unwrap();

    let result = timeout(
        Duration::from_secs(5),
        orchestrator.respond("New mirror cap"),
    )
    .await;
    assert!(result.is_err());
    let SessionState::Unanswered { call_id, reason } = orchestrator.state()
    else {
        panic!("expected an unanswered call, got {:?}", orchestrator.state());
    };
    assert_eq!(call_id, "call_1");
    assert!(reason.contains("did not complete"));
    assert_eq!(orchestrator.transcript().len(), 3);

    let reply = orchestrator.respond("next").await.unwrap();
    assert_eq!(reply, "That took too long.");
    let turns = orchestrator.transcript().turns();
    let Turn::ToolResult { call_id, content } = &turns[3] else {
        panic!("expected a tool result, got {:?}", turns[3]);
    };
    assert_eq!(call_id, "call_1");
    let content: Value = serde_json::from_str(content).unwrap();
    assert!(content["error"].as_str().unwrap().contains("did not complete"));
    assert_eq!(turns[4], Turn::User("next".to_owned()));
    assert_eq!(orchestrator.state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_provider_failure_keeps_committed_turns() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "create_change_context",
        CHANGE_CONTEXT_ARGS,
    ));
    provider.add_response(PresetResponse::text("never").with_failures(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut orchestrator = orchestrator(&provider, &calls);

    let err = orchestrator.respond("New mirror cap").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    // User turn, assistant turn with the call, and its result.
    assert_eq!(orchestrator.transcript().len(), 4);
    assert!(matches!(
        orchestrator.transcript().last(),
        Turn::ToolResult { call_id, .. } if call_id == "call_1"
    ));
    assert_eq!(orchestrator.state(), &SessionState::Idle);
}

#[test]
fn test_invalid_catalog() {
    struct Shadowing(Value);

    impl Tool for Shadowing {
        type Input = Value;
        type Output = ();

        fn name(&self) -> &str {
            "ask_clarification"
        }

        fn description(&self) -> &str {
            "Shadows a control tool."
        }

        fn parameter_schema(&self) -> &Value {
            &self.0
        }

        fn execute(
            &self,
            _input: Value,
        ) -> impl Future<Output = ToolResult<()>> + Send + 'static {
            ready(Ok(()))
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let err = OrchestratorBuilder::with_model_provider(
        TestModelProvider::default(),
    )
    .with_tool(Shadowing(json!({ "type": "object" })))
    .build()
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidCatalog);

    let err = OrchestratorBuilder::with_model_provider(
        TestModelProvider::default(),
    )
    .with_tool(CountingTool::new(calls.clone()))
    .with_tool(CountingTool::new(calls))
    .build()
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidCatalog);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let first = TestModelProvider::default();
    first.add_response(PresetResponse::text("first"));
    let second = TestModelProvider::default();
    second.add_response(PresetResponse::text("second"));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut a = orchestrator(&first, &calls);
    let mut b = orchestrator(&second, &calls);

    let (ra, rb) = tokio::join!(a.respond("A"), b.respond("B"));
    assert_eq!(ra.unwrap(), "first");
    assert_eq!(rb.unwrap(), "second");
    assert_eq!(a.transcript().turns()[1], Turn::User("A".to_owned()));
    assert_eq!(b.transcript().turns()[1], Turn::User("B".to_owned()));
}
