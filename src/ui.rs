//! Terminal front end: key mapping, rendering and the poll loop.

use std::io;
use std::thread;
use std::time::Duration;

use agent_gateway::Role;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthChar;

use crate::app::{InputAction, TurnState};
use crate::bridge::TURN_THREAD_PREFIX;
use crate::session::Session;
use crate::transcript::Transcript;

/// Cadence of the hand-off channel drain.
pub const POLL_INTERVAL: Duration = Duration::from_millis(30);
pub const WINDOW_TITLE: &str = "Hunter Chat";

const SEND_LABEL: &str = "[ Send ]";
const BUSY_LABEL: &str = "[ Busy ]";
const SEND_WIDTH: u16 = 12;
const KEY_HINTS: &str = "Enter send | Up/Down history | PgUp/PgDn scroll | Esc quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Input(InputAction),
    ScrollUp,
    ScrollDown,
}

/// Decodes a key press. Unbound keys map to `None`.
pub fn map_key(key: KeyEvent) -> Option<UiAction> {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Char('c') if control => InputAction::ControlC,
        KeyCode::Char('a') if control => InputAction::CursorHome,
        KeyCode::Char('e') if control => InputAction::CursorEnd,
        KeyCode::Char(_) if control || key.modifiers.contains(KeyModifiers::ALT) => return None,
        KeyCode::Char(ch) => InputAction::Insert(ch),
        KeyCode::Backspace => InputAction::Backspace,
        KeyCode::Delete => InputAction::Delete,
        KeyCode::Left => InputAction::CursorLeft,
        KeyCode::Right => InputAction::CursorRight,
        KeyCode::Home => InputAction::CursorHome,
        KeyCode::End => InputAction::CursorEnd,
        KeyCode::Up => InputAction::HistoryPrevious,
        KeyCode::Down => InputAction::HistoryNext,
        KeyCode::Enter => InputAction::Submit,
        KeyCode::Esc => InputAction::Quit,
        KeyCode::PageUp => return Some(UiAction::ScrollUp),
        KeyCode::PageDown => return Some(UiAction::ScrollDown),
        _ => return None,
    };

    Some(UiAction::Input(action))
}

/// Transcript scroll position, measured in rows from the bottom.
///
/// Zero means following: new text stays in view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptView {
    offset_from_bottom: usize,
    page_rows: usize,
}

impl TranscriptView {
    pub fn is_following(&self) -> bool {
        self.offset_from_bottom == 0
    }

    pub fn scroll_up(&mut self) {
        self.offset_from_bottom = self
            .offset_from_bottom
            .saturating_add(self.page_rows.max(1));
    }

    pub fn scroll_down(&mut self) {
        self.offset_from_bottom = self
            .offset_from_bottom
            .saturating_sub(self.page_rows.max(1));
    }

    /// Clamps to the content and returns the first visible row.
    fn top_row(&mut self, total_rows: usize, visible_rows: usize) -> usize {
        self.page_rows = visible_rows.saturating_sub(1).max(1);
        let max_offset = total_rows.saturating_sub(visible_rows);
        self.offset_from_bottom = self.offset_from_bottom.min(max_offset);
        max_offset - self.offset_from_bottom
    }
}

pub fn render(frame: &mut Frame<'_>, session: &Session, view: &mut TranscriptView) {
    let [transcript_area, input_row, status_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());
    let [input_area, send_area] =
        Layout::horizontal([Constraint::Min(10), Constraint::Length(SEND_WIDTH)]).areas(input_row);

    render_transcript(frame, transcript_area, &session.app().transcript, view);
    render_input(frame, input_area, session);
    render_send(frame, send_area, session.app().can_send());
    render_status(frame, status_area, session);
}

fn render_transcript(frame: &mut Frame<'_>, area: Rect, transcript: &Transcript, view: &mut TranscriptView) {
    let block = Block::bordered().title(format!(" {WINDOW_TITLE} "));
    let inner = block.inner(area);
    let rows = wrap_transcript(transcript, usize::from(inner.width));
    let top = view.top_row(rows.len(), usize::from(inner.height));

    let paragraph = Paragraph::new(rows)
        .block(block)
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame<'_>, area: Rect, session: &Session) {
    let input = &session.app().input;
    let block = Block::bordered().title(" Message ");
    let inner = block.inner(area);

    let cursor_column = input.cursor_column();
    let visible_width = usize::from(inner.width.max(1));
    let horizontal_scroll = cursor_column.saturating_sub(visible_width - 1);

    let paragraph = Paragraph::new(input.as_str())
        .block(block)
        .scroll((0, u16::try_from(horizontal_scroll).unwrap_or(u16::MAX)));
    frame.render_widget(paragraph, area);

    if !session.should_exit() && inner.width > 0 {
        let column = u16::try_from(cursor_column - horizontal_scroll).unwrap_or(0);
        frame.set_cursor_position((inner.x + column, inner.y));
    }
}

fn render_send(frame: &mut Frame<'_>, area: Rect, enabled: bool) {
    let (label, style) = if enabled {
        (
            SEND_LABEL,
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            BUSY_LABEL,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )
    };

    let paragraph = Paragraph::new(Span::styled(label, style))
        .alignment(Alignment::Center)
        .block(Block::bordered().border_style(style));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame<'_>, area: Rect, session: &Session) {
    let profile = session.profile();
    let state = match session.app().state {
        TurnState::Idle => Span::styled("ready", Style::default().fg(Color::Cyan)),
        TurnState::Running { turn_id } => Span::styled(
            format!("thinking (turn {turn_id})"),
            Style::default().fg(Color::Yellow),
        ),
    };
    let dim = Style::default().fg(Color::DarkGray);

    let line = Line::from(vec![
        Span::styled(format!("{}/{}", profile.provider_id, profile.model_id), dim),
        Span::raw("  "),
        state,
        Span::raw("  "),
        Span::styled(KEY_HINTS, dim),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Blue),
        Role::Assistant => Style::default(),
        Role::System => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    }
}

/// Hard-wraps transcript lines to `width` display columns.
pub fn wrap_transcript(transcript: &Transcript, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in transcript.lines() {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut row_width = 0usize;

        for segment in line {
            let style = role_style(segment.role);
            let mut piece = String::new();

            for ch in segment.text.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if row_width + ch_width > width && row_width > 0 {
                    if !piece.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut piece), style));
                    }
                    rows.push(Line::from(std::mem::take(&mut spans)));
                    row_width = 0;
                }
                piece.push(ch);
                row_width += ch_width;
            }

            if !piece.is_empty() {
                spans.push(Span::styled(piece, style));
            }
        }

        rows.push(Line::from(spans));
    }

    rows
}

/// Raw mode plus alternate screen, restored on drop.
struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { active: true };
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableBracketedPaste,
            SetTitle(WINDOW_TITLE)
        )?;
        Ok(guard)
    }

    fn restore(&mut self) {
        if !self.active {
            return;
        }

        self.active = false;
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Routes panics on turn workers to the log; the bridge reports them inline.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let on_turn_worker = thread::current()
            .name()
            .is_some_and(|name| name.starts_with(TURN_THREAD_PREFIX));
        if on_turn_worker {
            tracing::error!(%info, "turn worker panicked");
        } else {
            previous(info);
        }
    }));
}

/// Runs the UI until the user quits.
pub fn run(session: &mut Session) -> anyhow::Result<()> {
    install_panic_hook();
    let mut guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut view = TranscriptView::default();
    let mut dirty = true;

    while !session.should_exit() {
        if session.poll() > 0 {
            dirty = true;
        }
        if session.take_render_request() {
            dirty = true;
        }
        if dirty {
            terminal.draw(|frame| render(frame, session, &mut view))?;
            dirty = false;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match map_key(key) {
                Some(UiAction::Input(action)) => session.apply(action),
                Some(UiAction::ScrollUp) => {
                    view.scroll_up();
                    dirty = true;
                }
                Some(UiAction::ScrollDown) => {
                    view.scroll_down();
                    dirty = true;
                }
                None => {}
            },
            Event::Paste(text) => {
                for ch in text.chars().filter(|ch| !ch.is_control()) {
                    session.apply(InputAction::Insert(ch));
                }
            }
            Event::Resize(..) => dirty = true,
            _ => {}
        }
    }

    terminal.show_cursor()?;
    drop(terminal);
    guard.restore();
    tracing::info!("ui stopped");
    Ok(())
}
