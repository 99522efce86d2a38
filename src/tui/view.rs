use crate::shared::DisplayState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, Paragraph};
use ratatui::Frame;

use super::grid::draw_key_grid;
use super::mode::TuiState;

const HELP: &str = "0-9 play  hold: stop  + add  Backspace remove playing  Tab next list  Esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(12),   // key grid + clip list
            Constraint::Length(1), // prompt or notice
            Constraint::Length(1), // help
        ])
        .split(area);

    draw_header(frame, sections[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(sections[1]);
    draw_key_grid(frame, body[0], &state.keys, state.shown_key);
    draw_clip_list(frame, body[1], state);

    draw_status(frame, sections[2], state, ts);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let playing = match state.active_key() {
        Some(key) => format!("playing key {key}"),
        None => "idle".to_string(),
    };
    let line = Line::from(vec![
        Span::styled("soundboard", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  policy: {}  ", state.policy.label())),
        Span::styled(playing, Style::default().fg(Color::LightMagenta)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_clip_list(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let items: Vec<ListItem> = state
        .shown_clips
        .iter()
        .enumerate()
        .map(|(i, clip)| {
            let style = if clip.active {
                Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{:>2}. {}", i + 1, clip.name)).style(style)
        })
        .collect();
    let title = format!(" key {} ({}) ", state.shown_key, items.len());
    frame.render_widget(List::new(items).block(Block::bordered().title(title)), area);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let line = match (&ts.prompt, &state.notice) {
        (Some(prompt), _) => Line::styled(prompt.label(), Style::default().fg(Color::Yellow)),
        (None, Some(notice)) => Line::raw(notice.as_str()),
        (None, None) => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}
