/// Error taxonomy for loading packs, reading progress and driving the terminal.
///
/// Everything except `UnwritableFile` is fatal at load time: `main` restores
/// the terminal, prints the message and exits non-zero.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum GameError {
    /// Terminal is smaller than the fixed playfield
    #[error("console is too small: {width}x{height}, need at least {min_width}x{min_height}")]
    ConsoleTooSmall {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    /// Pack text does not follow the `Levels: N` / `w: W, h: H` layout
    #[error("invalid level pack \"{pack}\" (line {line}): {reason}")]
    Format {
        pack: String,
        line: usize,
        reason: String,
    },

    #[error("level pack \"{pack}\" declares {count} levels, the maximum is {max}")]
    TooManyLevels {
        pack: String,
        count: usize,
        max: usize,
    },

    /// Level does not fit the playfield (W <= width, H < height)
    #[error("level {level} of pack \"{pack}\" is {width}x{height}, the playfield allows {max_width}x{max_height_exclusive} (height exclusive)")]
    OversizedLevel {
        pack: String,
        level: usize,
        width: usize,
        height: usize,
        max_width: usize,
        max_height_exclusive: usize,
    },

    #[error("can not read \"{}\": {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Progress could not be persisted; never fatal
    #[error("can not write \"{}\": {source}", path.display())]
    UnwritableFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Terminal I/O failed
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl GameError {
    /// Build a `Format` error for pack `pack` at 1-based line `line`.
    pub fn format(pack: &str, line: usize, reason: impl Into<String>) -> Self {
        GameError::Format {
            pack: pack.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the game.
pub type GameResult<T> = Result<T, GameError>;
