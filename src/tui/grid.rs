use crate::shared::{KeyView, SlotKey, NUM_KEYS};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

const COLS: usize = 3;
const ROWS: usize = 4;

// numpad order, 0 alone in the middle of the bottom row
const LAYOUT: [[Option<char>; COLS]; ROWS] = [
    [Some('1'), Some('2'), Some('3')],
    [Some('4'), Some('5'), Some('6')],
    [Some('7'), Some('8'), Some('9')],
    [None, Some('0'), None],
];

pub fn draw_key_grid(frame: &mut Frame, area: Rect, keys: &[KeyView; NUM_KEYS], shown: SlotKey) {
    let row_constraints = [Constraint::Percentage(25); ROWS];
    let col_constraints = [Constraint::Ratio(1, COLS as u32); COLS];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let Some(key) = LAYOUT[row_idx][col_idx].and_then(SlotKey::from_char) else {
                continue;
            };
            let view = &keys[key.index()];
            let mut border = key_style(view);
            if key == shown {
                border = border.add_modifier(Modifier::BOLD);
            }
            let block = Block::bordered()
                .title(format!(" {key} "))
                .border_style(border)
                .style(key_style(view));
            let body = Paragraph::new(Line::from(key_caption(view)))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(body, *cell_area);
        }
    }
}

fn key_style(view: &KeyView) -> Style {
    if view.active {
        Style::default().fg(Color::LightMagenta).bg(Color::Magenta)
    } else if view.clip_count == 0 {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Gray)
    }
}

pub fn key_caption(view: &KeyView) -> String {
    match (view.clip_count, view.full) {
        (0, _) => "empty".to_string(),
        (n, true) => format!("{n} clips FULL"),
        (1, false) => "1 clip".to_string(),
        (n, false) => format!("{n} clips"),
    }
}
