use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::pipeline::selector::PlaybackPolicy;
use crate::shared::DEFAULT_LONG_PRESS_MS;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: PlaybackPolicy,
    pub long_press_ms: u64,
    pub gain: f32,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: PlaybackPolicy::default(),
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            gain: 0.8,
            seed: None,
        }
    }
}

impl Config {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

// A missing file means defaults; a file that doesn't parse is an error.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    toml::from_str(&content).with_context(|| format!("invalid config in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.long_press(), Duration::from_millis(1000));
        assert_eq!(config.policy, PlaybackPolicy::Random);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "policy = \"round-robin\"\nseed = 5\n").unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.policy, PlaybackPolicy::RoundRobin);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.long_press_ms, DEFAULT_LONG_PRESS_MS);
    }

    #[test]
    fn bad_policy_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "policy = \"shuffle\"\n").unwrap();
        assert!(load(&path).is_err());
    }
}
