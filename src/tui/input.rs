use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crate::shared::{InputEvent, SlotKey};
use super::mode::{Prompt, TuiState};

// poll for input from tui, tracks the add prompt in tuistate,
// resolves key edges to input events for the middle layer to handle
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }
    let mut events = vec![];
    // drain whatever else is already queued so a burst doesn't lag a frame per key
    loop {
        if let Event::Key(key) = event::read()? {
            events.extend(handle_key(key, ts));
        }
        if !event::poll(Duration::ZERO)? {
            break;
        }
    }
    Ok(events)
}

pub fn handle_key(key: KeyEvent, ts: &mut TuiState) -> Vec<InputEvent> {
    if key.kind == KeyEventKind::Release {
        // releases always go through so a held key can't get stuck
        return match key.code {
            KeyCode::Char(c) => vec![InputEvent::KeyUp(c)],
            _ => vec![],
        };
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return vec![InputEvent::Quit];
    }
    if ts.prompt.is_some() {
        return handle_prompt(key.code, ts);
    }
    // held keys auto-repeat; only the first edge counts
    if key.kind == KeyEventKind::Repeat {
        return vec![];
    }

    match key.code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char('+') => {
            ts.prompt = Some(Prompt::default());
            vec![]
        }
        KeyCode::Tab => {
            ts.shown_key = ts.shown_key.next();
            vec![InputEvent::ShowKey(ts.shown_key)]
        }
        KeyCode::Backspace => vec![InputEvent::RemoveActiveClip],
        // anything else is a key edge; the dispatcher ignores unbound ones
        KeyCode::Char(c) => vec![InputEvent::KeyDown(c)],
        _ => vec![],
    }
}

fn handle_prompt(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let Some(prompt) = ts.prompt.as_mut() else {
        return vec![];
    };
    match (prompt.key, code) {
        (_, KeyCode::Esc) => {
            ts.prompt = None;
            vec![]
        }
        (None, KeyCode::Char(c)) => {
            prompt.key = SlotKey::from_char(c);
            vec![]
        }
        (Some(_), KeyCode::Char(c)) => {
            prompt.text.push(c);
            vec![]
        }
        (Some(_), KeyCode::Backspace) => {
            prompt.text.pop();
            vec![]
        }
        (Some(key), KeyCode::Enter) => {
            let paths = prompt.paths();
            ts.prompt = None;
            if paths.is_empty() {
                return vec![];
            }
            ts.shown_key = key;
            vec![InputEvent::ShowKey(key), InputEvent::AddClips { key, paths }]
        }
        _ => vec![],
    }
}
