use std::time::Duration;

use agent_gateway::{AgentGateway, Conversation, GatewayError, ToolRegistry, Turn};
use agent_gateway_mock::{EchoGateway, ScriptedGateway, MOCK_PROVIDER_ID};
use calculator::CalculatorTool;
use pretty_assertions::assert_eq;

fn conversation(prompt: &str) -> Conversation {
    [Turn::user(prompt)].into_iter().collect()
}

#[test]
fn scripted_gateway_replays_fragments_in_order() {
    let gateway = ScriptedGateway::new(["Hello", " world"]);
    let history = conversation("hi");

    let produced: Vec<_> = gateway.stream(&history).collect();

    assert_eq!(
        produced,
        vec![Ok("Hello".to_string()), Ok(" world".to_string())]
    );
}

#[test]
fn scripted_gateway_is_replayable_per_turn() {
    let gateway = ScriptedGateway::new(["one"]);
    let history = conversation("again");

    assert_eq!(gateway.stream(&history).count(), 1);
    assert_eq!(gateway.stream(&history).count(), 1);
}

#[test]
fn scripted_failure_stops_the_stream_after_the_error() {
    let gateway = ScriptedGateway::new(["partial", "never sent"]).failing_after(1, "boom");
    let history = conversation("hi");

    let produced: Vec<_> = gateway.stream(&history).collect();

    assert_eq!(
        produced,
        vec![
            Ok("partial".to_string()),
            Err(GatewayError::Other("boom".to_string())),
        ]
    );
}

#[test]
fn scripted_failure_past_the_end_fires_after_last_fragment() {
    let gateway = ScriptedGateway::new(["a"])
        .failing_after(10, "late")
        .with_fragment_delay(Duration::from_millis(1));
    let history = conversation("hi");

    let produced: Vec<_> = gateway.stream(&history).collect();

    assert_eq!(produced.len(), 2);
    assert!(produced[1].is_err());
}

#[test]
fn echo_gateway_routes_arithmetic_through_calculator() {
    let gateway = EchoGateway::new(ToolRegistry::new().with_tool(CalculatorTool))
        .with_token_delay(Duration::ZERO);
    let history = conversation("what is (2 + 3) * 4?");

    let reply: String = gateway
        .stream(&history)
        .collect::<Result<Vec<_>, _>>()
        .expect("echo gateway does not fail")
        .concat();

    assert_eq!(reply, "(2 + 3) * 4 = 20");
    assert_eq!(gateway.profile().provider_id, MOCK_PROVIDER_ID);
}

#[test]
fn echo_gateway_echoes_non_arithmetic_prompts_word_by_word() {
    let gateway = EchoGateway::new(ToolRegistry::new().with_tool(CalculatorTool))
        .with_token_delay(Duration::ZERO);
    let history = conversation("tell me a story");

    let fragments: Vec<String> = gateway
        .stream(&history)
        .collect::<Result<_, _>>()
        .expect("echo gateway does not fail");

    assert_eq!(
        fragments,
        vec!["You ", "said: ", "tell ", "me ", "a ", "story"]
    );
}
