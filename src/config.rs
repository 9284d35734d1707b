/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD or
/// ~/.local/share/sokoterm (first found wins).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".local/share/sokoterm";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Directory for built-in pack progress. None = pick automatically.
    pub save_dir: Option<PathBuf>,
    /// Directory scanned for extra `*.lvl` packs, if it exists.
    pub packs_dir: Option<PathBuf>,
    pub timing: TimingConfig,
    pub sound_enabled: bool,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// `log` level filter name: off, error, warn, info, debug, trace.
    pub level: String,
    /// Log file; relative paths are resolved against the save directory.
    pub file: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    logging: TomlLogging,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    save_dir: String,
    #[serde(default = "default_packs_dir")]
    packs_dir: String,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_sound_enabled")]
    enabled: bool,
}

#[derive(Deserialize, Debug)]
struct TomlLogging {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default = "default_log_file")]
    file: String,
}

// ── Defaults ──

fn default_packs_dir() -> String { "packs".into() }
fn default_tick_rate() -> u64 { 40 }
fn default_sound_enabled() -> bool { true }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> String { "sokoterm.log".into() }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            save_dir: String::new(),
            packs_dir: default_packs_dir(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: default_sound_enabled() }
    }
}

impl Default for TomlLogging {
    fn default() -> Self {
        TomlLogging {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        Self::load_from(&candidate_dirs())
    }

    pub fn load_from(search_dirs: &[PathBuf]) -> Self {
        let toml_cfg = load_toml(search_dirs);

        let save_dir = Some(toml_cfg.general.save_dir.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        // Relative packs dir: first candidate that has it
        let packs = PathBuf::from(&toml_cfg.general.packs_dir);
        let packs_dir = if packs.is_absolute() {
            Some(packs).filter(|p| p.is_dir())
        } else {
            search_dirs.iter().map(|d| d.join(&packs)).find(|p| p.is_dir())
        };

        GameConfig {
            save_dir,
            packs_dir,
            timing: TimingConfig {
                tick_rate_ms: toml_cfg.timing.tick_rate_ms.max(1),
            },
            sound_enabled: toml_cfg.sound.enabled,
            logging: LoggingConfig {
                level: toml_cfg.logging.level,
                file: PathBuf::from(toml_cfg.logging.file),
            },
        }
    }

    /// Log file location with relative paths placed under `data_dir`.
    pub fn log_path(&self, data_dir: &Path) -> PathBuf {
        if self.logging.file.is_absolute() {
            self.logging.file.clone()
        } else {
            data_dir.join(&self.logging.file)
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/sokoterm)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(DATA_DIR);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is set up, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
