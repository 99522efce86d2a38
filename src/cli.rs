use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::pipeline::selector::PlaybackPolicy;
use crate::shared::SlotKey;

#[derive(Parser)]
#[command(name = "soundboard", about = "Bind audio clips to the number keys and play them")]
pub struct Cli {
    /// Project directory holding .soundboard/ (default: current directory)
    pub project_dir: Option<PathBuf>,

    /// How a key picks among its clips
    #[arg(long, value_enum)]
    pub policy: Option<PlaybackPolicy>,

    /// Hold a key this long to force-stop playback
    #[arg(long)]
    pub long_press_ms: Option<u64>,

    /// Config file (default: <project_dir>/.soundboard/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bind audio files to a key
    Add {
        key: SlotKey,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove one clip from a key by its position (1-based)
    Remove { key: SlotKey, index: usize },
    /// Remove every clip from a key
    Clear { key: SlotKey },
    /// Print all bindings
    List,
}
