/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};

use config::GameConfig;
use error::GameResult;
use sim::event::GameEvent;
use sim::level::{discover_sources, load_catalog, LevelPack};
use sim::save::SaveStore;
use sim::step;
use sim::world::SessionState;
use ui::input::InputState;
use ui::renderer::{check_terminal_size, Renderer};
use ui::sound::SoundEngine;

/// Environment variable overriding the configured log filter.
const LOG_ENV: &str = "SOKOTERM_LOG";

#[derive(Parser, Debug)]
#[command(name = "sokoterm", version, about = "Terminal Sokoban with keys, locked doors and one-way tiles")]
struct Args {
    /// Extra level pack files (*.lvl), listed after the built-in packs
    packs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = GameConfig::load();
    let store = SaveStore::locate(config.save_dir.as_deref());
    init_logging(&config, store.dir());
    info!("sokoterm {} starting, save dir {}", env!("CARGO_PKG_VERSION"), store.dir().display());

    let packs = match load_packs(&args, &config) {
        Ok(packs) => packs,
        Err(e) => return fail(&e),
    };
    if let Err(e) = check_terminal_size() {
        return fail(&e);
    }

    let mut state = SessionState::new(packs, store);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        let _ = renderer.cleanup();
        return fail(&e.into());
    }

    let sound = if config.sound_enabled { SoundEngine::new() } else { None };
    if config.sound_enabled && sound.is_none() {
        warn!("no audio output device, sound disabled");
    }

    let result = game_loop(&mut state, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(()) => {
            info!("bye");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fail(e: &error::GameError) -> ExitCode {
    error!("{e}");
    println!("{e}");
    ExitCode::FAILURE
}

fn load_packs(args: &Args, config: &GameConfig) -> GameResult<Vec<LevelPack>> {
    let sources = discover_sources(&args.packs, config.packs_dir.as_deref());
    let packs = load_catalog(sources)?;
    info!("loaded {} level packs", packs.len());
    Ok(packs)
}

/// Log to the configured file only; the terminal belongs to the game.
/// Without a writable log file logging is off.
fn init_logging(config: &GameConfig, data_dir: &Path) {
    let mut builder = env_logger::Builder::new();
    let level = LevelFilter::from_str(&config.logging.level).unwrap_or(LevelFilter::Info);
    builder.filter_level(level);
    builder.parse_env(env_logger::Env::new().filter(LOG_ENV));

    let path = config.log_path(data_dir);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

fn game_loop(
    state: &mut SessionState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> GameResult<()> {
    let mut input = InputState::new();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);

    while !state.should_exit {
        input.drain_events();
        if input.ctrl_c_pressed() {
            info!("interrupted");
            break;
        }

        // At most one key and one click per tick
        let now = Instant::now();
        let mut events = Vec::new();
        if let Some(key) = input.next_key() {
            events.extend(step::handle_key(state, key, now)?);
        }
        if let Some((column, row)) = input.next_click() {
            events.extend(step::handle_click(state, column, row, now)?);
        }
        process_sound_events(sound, &events);

        step::tick(state);
        renderer.render(state, now)?;
        std::thread::sleep(tick_rate);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::Step => sfx.play_step(),
            GameEvent::Push => sfx.play_push(),
            GameEvent::DoorOpened => sfx.play_door(),
            GameEvent::Undo => sfx.play_undo(),
            GameEvent::Reset => sfx.play_reset(),
            GameEvent::LevelComplete { level, time_ms, moves } => {
                debug!("level {} done: {} ms, {} moves", level + 1, time_ms, moves);
                sfx.play_complete();
            }
            GameEvent::PackComplete => sfx.play_pack_complete(),
            GameEvent::Select => sfx.play_select(),
            GameEvent::Rejected => sfx.play_rejected(),
            GameEvent::DialogOpened => sfx.play_dialog(),
            GameEvent::HelpOpened | GameEvent::HelpPageTurned => sfx.play_page(),
        }
    }
}
