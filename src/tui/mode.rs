use std::path::PathBuf;

use crate::shared::SlotKey;

// state local to tui: the add-clips prompt and which key's list is shown.
// shown_key is synced from DisplayState every frame
#[derive(Clone, Debug)]
pub struct TuiState {
    pub prompt: Option<Prompt>,
    pub shown_key: SlotKey,
}

impl TuiState {
    pub fn new(shown_key: SlotKey) -> Self {
        Self {
            prompt: None,
            shown_key,
        }
    }
}

/// `+`, then the target key, then one or more paths separated by `;`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prompt {
    pub key: Option<SlotKey>,
    pub text: String,
}

impl Prompt {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.text
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn label(&self) -> String {
        match self.key {
            None => "add to key: press 0-9".to_string(),
            Some(key) => format!("add to key {key}: {}_", self.text),
        }
    }
}
