mod support;

use std::time::Duration;

use agent_gateway_mock::ScriptedGateway;
use hunter::app::STARTUP_HINT;
use hunter::session::Session;
use hunter::ui::{render, TranscriptView};
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use support::{session_with, wait_for_idle};

const WIDTH: u16 = 72;
const HEIGHT: u16 = 14;

fn draw(session: &Session, view: &mut TranscriptView) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).expect("test terminal");
    terminal
        .draw(|frame| render(frame, session, view))
        .expect("draw");

    let buffer = terminal.backend().buffer();
    (0..HEIGHT)
        .map(|y| (0..WIDTH).map(|x| buffer[(x, y)].symbol()).collect())
        .collect()
}

fn screen_contains(rows: &[String], needle: &str) -> bool {
    rows.iter().any(|row| row.contains(needle))
}

#[test]
fn idle_screen_shows_hint_send_and_status() {
    let session = session_with(ScriptedGateway::new(["unused"]));
    let rows = draw(&session, &mut TranscriptView::default());

    assert!(screen_contains(&rows, STARTUP_HINT), "{rows:#?}");
    assert!(screen_contains(&rows, "[ Send ]"), "{rows:#?}");
    assert!(rows[usize::from(HEIGHT) - 1].starts_with("mock/scripted  ready"), "{rows:#?}");
}

#[test]
fn running_turn_shows_busy_affordance() {
    let gateway = ScriptedGateway::new(["slow"]).with_fragment_delay(Duration::from_millis(200));
    let mut session = session_with(gateway);
    session.submit("hi");

    let rows = draw(&session, &mut TranscriptView::default());
    assert!(screen_contains(&rows, "[ Busy ]"), "{rows:#?}");
    assert!(screen_contains(&rows, "thinking (turn 1)"), "{rows:#?}");

    wait_for_idle(&mut session);
    let rows = draw(&session, &mut TranscriptView::default());
    assert!(screen_contains(&rows, "[ Send ]"), "{rows:#?}");
    assert!(screen_contains(&rows, "Assistant: slow"), "{rows:#?}");
}

#[test]
fn transcript_follows_the_newest_line() {
    let mut session = session_with(ScriptedGateway::new(["ok"]));
    for index in 0..12 {
        session.submit(&format!("message {index}"));
        wait_for_idle(&mut session);
    }

    let mut view = TranscriptView::default();
    let rows = draw(&session, &mut view);
    assert!(screen_contains(&rows, "You: message 11"), "{rows:#?}");
    assert!(!screen_contains(&rows, STARTUP_HINT), "{rows:#?}");

    view.scroll_up();
    view.scroll_up();
    view.scroll_up();
    view.scroll_up();
    let rows = draw(&session, &mut view);
    assert!(!view.is_following());
    assert!(screen_contains(&rows, STARTUP_HINT), "{rows:#?}");
}
