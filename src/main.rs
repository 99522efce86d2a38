mod shared;
mod tui;
mod audio_api;
mod audio;
mod cli;
mod config;
mod error;
mod loader;
mod middle;
mod pipeline;

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use cli::{Cli, Command};
use config::Config;
use middle::Middle;
use pipeline::persistence::{ProjectDir, SOUNDBOARD_DIR};
use pipeline::selector::PlaybackPolicy;
use shared::{InputEvent, SlotKey};

// bindings edited from the command line are decoded but never played
const OFFLINE_SAMPLE_RATE: u32 = 44100;
const FRAME_TIME: Duration = Duration::from_millis(16); // ~60fps

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let Cli {
        project_dir,
        policy,
        long_press_ms,
        config,
        command,
    } = Cli::parse();
    let project_dir = match project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("no current directory")?,
    };
    let config_path =
        config.unwrap_or_else(|| project_dir.join(SOUNDBOARD_DIR).join(config::CONFIG_FILE));

    match command {
        Some(command) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .init();
            let config = load_config(&config_path, policy, long_press_ms)?;
            manage(command, &project_dir, &config)
        }
        None => {
            // raw mode logger first so config problems are visible
            log::set_logger(&RAW_MODE_LOGGER).ok();
            log::set_max_level(
                std::env::var("RUST_LOG")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(log::LevelFilter::Warn),
            );
            let config = load_config(&config_path, policy, long_press_ms)?;
            play(&project_dir, &config)
        }
    }
}

// command line flags win over the config file
fn load_config(
    path: &Path,
    policy: Option<PlaybackPolicy>,
    long_press_ms: Option<u64>,
) -> anyhow::Result<Config> {
    let mut config = config::load(path)?;
    if let Some(policy) = policy {
        config.policy = policy;
    }
    if let Some(ms) = long_press_ms {
        config.long_press_ms = ms;
    }
    log::debug!("config: {config:?}");
    Ok(config)
}

fn manage(command: Command, project_dir: &Path, config: &Config) -> anyhow::Result<()> {
    let store = Box::new(ProjectDir::new(project_dir));
    let mut middle = Middle::new(config, store, OFFLINE_SAMPLE_RATE, false);
    // no engine to send these to
    let _ = middle.restore();
    if let Some(notice) = &middle.display_state().notice {
        eprintln!("{notice}");
    }

    match command {
        Command::Add { key, files } => {
            let (added, rejected) = middle.add_files(key, &files);
            for clip in &added {
                println!("key {key}: added {}", clip.name);
            }
            // rejections are reported per file and don't fail the command
            for e in &rejected {
                eprintln!("{e}");
            }
        }
        Command::Remove { key, index } => {
            let clip = index
                .checked_sub(1)
                .and_then(|i| middle.remove_at(key, i))
                .with_context(|| format!("key {key} has no clip {index}"))?;
            println!("key {key}: removed {}", clip.name);
        }
        Command::Clear { key } => {
            let n = middle.clear_key(key);
            println!("key {key}: removed {n} clip(s)");
        }
        Command::List => print_bindings(&middle),
    }
    Ok(())
}

fn print_bindings(middle: &Middle) {
    for key in SlotKey::all() {
        let slot = middle.store().slot(key);
        if slot.is_empty() {
            continue;
        }
        let full = if slot.is_full() { " (full)" } else { "" };
        println!("key {key}{full}:");
        for (i, clip) in slot.clips().iter().enumerate() {
            println!("  {:>2}. {}  {}", i + 1, clip.name, clip.source.display());
        }
    }
}

fn play(project_dir: &Path, config: &Config) -> anyhow::Result<()> {
    // Without release events there is no way to tell a hold from a tap.
    let releases_reported = terminal::supports_keyboard_enhancement().unwrap_or(false);
    if !releases_reported {
        log::warn!("terminal doesn't report key releases, holding a key won't stop playback");
    }

    terminal::enable_raw_mode()?;
    if releases_reported {
        let _ = crossterm::execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
            )
        );
    }
    let _guard = RawModeGuard { releases_reported }; // auto drops when out of scope

    let audio = audio::start_audio(config.gain)?;
    let store = Box::new(ProjectDir::new(project_dir));
    let mut middle = Middle::new(config, store, audio.sample_rate(), releases_reported);
    for cmd in middle.restore() {
        audio.send(cmd);
    }

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let mut tui_state = tui::mode::TuiState::new(middle.display_state().shown_key);

    loop {
        let ds = middle.display_state();
        tui_state.shown_key = ds.shown_key;
        term.draw(|frame| {
            let area = frame.area();
            tui::view::render(frame, area, ds, &tui_state);
        })?;

        // wake up early if a long press is due before the next frame
        let timeout = middle
            .next_deadline()
            .map_or(FRAME_TIME, |d| d.saturating_duration_since(Instant::now()).min(FRAME_TIME));

        let events = tui::input::poll_input(timeout, &mut tui_state)?;
        for event in events {
            let quit = event == InputEvent::Quit;
            for cmd in middle.handle_input(event, Instant::now()) {
                audio.send(cmd);
            }
            if quit {
                log::info!("quitting");
                term.clear()?;
                return Ok(());
            }
        }

        for event in audio.poll_events() {
            for cmd in middle.on_audio_event(event) {
                audio.send(cmd);
            }
        }
        for cmd in middle.tick(Instant::now()) {
            audio.send(cmd);
        }
    }
}

/// Writes to stderr with \r\n line endings, since raw mode doesn't translate \n.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400; // time of day
            let _ = write!(
                std::io::stderr(),
                "[{:02}:{:02}:{:02}.{:03} {}] {}\r\n",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                now.subsec_millis(),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

struct RawModeGuard {
    releases_reported: bool,
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.releases_reported {
            let _ = crossterm::execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}
