mod support;

use std::time::Duration;

use agent_gateway::{Role, Turn};
use agent_gateway_mock::{EchoGateway, ScriptedGateway};
use hunter::app::{App, InputAction, TurnState, STARTUP_HINT};
use hunter::bridge::OutputEvent;
use hunter::tools::default_tools;
use pretty_assertions::assert_eq;

use support::{session_with, wait_for_idle, HostSpy, PanickingGateway};

#[test]
fn streamed_reply_lands_on_one_assistant_line() {
    let mut session = session_with(ScriptedGateway::new(["Hello", " world"]));

    session.submit("hi");
    assert_eq!(session.app().state, TurnState::Running { turn_id: 1 });
    wait_for_idle(&mut session);

    assert_eq!(
        session.app().transcript.plain_text(),
        format!("{STARTUP_HINT}\nYou: hi\nAssistant: Hello world\n")
    );
    assert_eq!(session.app().state, TurnState::Idle);
    assert_eq!(
        session.app().conversation().turns(),
        &[Turn::user("hi"), Turn::assistant("Hello world")]
    );
}

#[test]
fn gateway_failure_keeps_partial_text_and_reports_error() {
    let mut session = session_with(ScriptedGateway::new(["partial", "never"]).failing_after(1, "boom"));

    session.submit("hi");
    wait_for_idle(&mut session);

    let text = session.app().transcript.plain_text();
    assert!(text.contains("Assistant: partial\n"), "{text}");
    assert!(text.lines().any(|line| line == "[Error] boom"), "{text}");
    assert!(!text.contains("never"));
    assert_eq!(session.app().state, TurnState::Idle);

    // The user turn stays; the failed reply is not committed.
    assert_eq!(session.app().conversation().turns(), &[Turn::user("hi")]);
}

#[test]
fn panicking_gateway_still_ends_the_turn() {
    let mut session = session_with(PanickingGateway);

    session.submit("hi");
    wait_for_idle(&mut session);

    let text = session.app().transcript.plain_text();
    assert!(text.contains("[Error] agent gateway panicked: gateway exploded"), "{text}");
    assert!(session.app().can_send());
}

#[test]
fn submissions_while_running_are_dropped() {
    let gateway = ScriptedGateway::new(["slow", " reply"]).with_fragment_delay(Duration::from_millis(40));
    let mut session = session_with(gateway);

    session.submit("a");
    session.submit("b");
    assert!(session.app().is_running());
    assert!(!session.app().can_send());
    wait_for_idle(&mut session);

    assert_eq!(session.app().history_entries(), &["a".to_string()]);
    let text = session.app().transcript.plain_text();
    assert!(!text.contains("You: b"), "{text}");
    assert_eq!(session.app().conversation().len(), 2);
}

#[test]
fn blank_submission_is_ignored() {
    let mut session = session_with(ScriptedGateway::new(["unused"]));
    let before = session.app().transcript.clone();

    session.submit("   ");

    assert_eq!(session.app().transcript, before);
    assert_eq!(session.app().state, TurnState::Idle);
    assert!(session.app().history_entries().is_empty());
}

#[test]
fn next_turn_starts_after_terminal_and_sees_history() {
    let mut session = session_with(EchoGateway::new(default_tools()));

    session.submit("first message");
    wait_for_idle(&mut session);
    session.submit("(2 + 3) * 4");
    wait_for_idle(&mut session);

    let turns = session.app().conversation().turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0], Turn::user("first message"));
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[2], Turn::user("(2 + 3) * 4"));
    assert!(turns[3].text.contains("20"), "{}", turns[3].text);
    assert_eq!(session.app().state, TurnState::Idle);
}

#[test]
fn quit_command_exits_without_starting_a_turn() {
    let mut session = session_with(ScriptedGateway::new(["unused"]));

    session.submit("/QUIT");

    assert!(session.should_exit());
    assert!(session.app().conversation().is_empty());
}

#[test]
fn control_c_clears_input_before_quitting() {
    let mut session = session_with(ScriptedGateway::new(["unused"]));
    for ch in "draft".chars() {
        session.apply(InputAction::Insert(ch));
    }

    session.apply(InputAction::ControlC);
    assert!(session.app().input.is_empty());
    assert!(!session.should_exit());

    session.apply(InputAction::ControlC);
    assert!(session.should_exit());
}

#[test]
fn history_recalls_sent_prompts() {
    let mut session = session_with(ScriptedGateway::new(["ok"]));
    session.submit("one");
    wait_for_idle(&mut session);
    session.submit("two");
    wait_for_idle(&mut session);

    session.apply(InputAction::HistoryPrevious);
    assert_eq!(session.app().input.as_str(), "two");
    session.apply(InputAction::HistoryPrevious);
    assert_eq!(session.app().input.as_str(), "one");
    session.apply(InputAction::HistoryNext);
    assert_eq!(session.app().input.as_str(), "two");
    session.apply(InputAction::HistoryNext);
    assert_eq!(session.app().input.as_str(), "");
}

#[test]
fn spawn_failure_is_reported_and_app_stays_idle() {
    let mut app = App::new();
    let mut host = HostSpy::failing("no threads left");

    app.on_input_replace("hello");
    app.on_submit(&mut host);

    assert_eq!(app.state, TurnState::Idle);
    assert!(app.conversation().is_empty());
    assert!(app.history_entries().is_empty());
    assert_eq!(
        app.transcript.plain_text(),
        "[Error] Failed to start turn: failed to spawn turn worker: no threads left\n"
    );
    assert_eq!(app.input.as_str(), "hello");
    assert!(host.renders > 0);

    // The transcript and the conversation agree once a turn does start.
    host.fail_with = None;
    app.on_submit(&mut host);
    assert_eq!(app.conversation().turns(), &[Turn::user("hello")]);
    assert!(app.transcript.plain_text().ends_with("You: hello\nAssistant: "));
}

#[test]
fn fragments_apply_in_order_and_stale_turns_are_ignored() {
    let mut app = App::with_system_instructions("Be brief.");
    let mut host = HostSpy::default();

    app.on_input_replace("hi");
    app.on_submit(&mut host);
    assert_eq!(host.started.len(), 1);
    assert_eq!(
        host.started[0].turns(),
        &[Turn::system("Be brief."), Turn::user("hi")]
    );

    for (turn_id, content) in [(1, "a"), (7, "stale"), (1, "b"), (1, "c")] {
        app.on_output_event(
            OutputEvent::TextFragment {
                turn_id,
                content: content.to_string(),
            },
            &mut host,
        );
    }
    app.on_output_event(OutputEvent::Terminal { turn_id: 1, error: None }, &mut host);

    assert_eq!(app.transcript.plain_text(), "You: hi\nAssistant: abc\n");
    assert_eq!(app.conversation().last(), Some(&Turn::assistant("abc")));

    // Events after the terminal one are dropped.
    app.on_output_event(
        OutputEvent::TextFragment {
            turn_id: 1,
            content: "late".to_string(),
        },
        &mut host,
    );
    assert!(!app.transcript.plain_text().contains("late"));
}
