/// Level catalog: pack parsing, validation and discovery.
///
/// ## Sources (catalog order):
///   1. Built-in packs compiled into the binary
///   2. Pack files named on the command line
///   3. `*.lvl` files in the configured packs directory (sorted by name)
///
/// At most `MAX_PACK_COUNT` packs are installed; extra sources are dropped
/// with a warning.
///
/// ## Pack format (`.lvl`):
///   ```text
///   Levels: 2
///
///   w: 9, h: 3
///   #########
///   #P---@x-#
///   #########
///
///   w: 5, h: 3
///   ...
///   ```
///
/// Blank lines are ignored everywhere after the header. Rows shorter than
/// `W` are padded with Empty; longer rows are rejected.
/// See `Tile::from_char` for the character legend.
///
/// Any error aborts the whole pack: a pack is either installed complete
/// or not at all.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::domain::entity::Position;
use crate::domain::grid::Grid;
use crate::domain::tile::Tile;
use crate::error::{GameError, GameResult};

/// Playfield limits: a level must satisfy `w <= PLAYFIELD_WIDTH` and
/// `h < PLAYFIELD_HEIGHT` (one row is reserved for the HUD).
pub const PLAYFIELD_WIDTH: usize = 74;
pub const PLAYFIELD_HEIGHT: usize = 23;

pub const MAX_LEVELS_PER_PACK: usize = 192;
pub const MAX_PACK_COUNT: usize = 64;

pub const PACK_EXTENSION: &str = "lvl";

/// Where a pack's text comes from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PackSource {
    Builtin(&'static str),
    File(PathBuf),
}

impl PackSource {
    /// Human-readable name used in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            PackSource::Builtin(id) => format!("builtin:{id}"),
            PackSource::File(path) => path.display().to_string(),
        }
    }
}

/// A parsed pack. Level templates are never mutated after parse.
#[derive(Clone, Debug)]
pub struct LevelPack {
    pub id: String,
    pub source: PackSource,
    levels: Vec<Grid>,
}

impl LevelPack {
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> Option<&Grid> {
        self.levels.get(index)
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load and validate one pack.
pub fn load_pack(source: PackSource) -> GameResult<LevelPack> {
    let name = source.display_name();
    let (id, levels) = match &source {
        PackSource::Builtin(id) => {
            let text = builtin_text(id).ok_or_else(|| GameError::format(&name, 0, "unknown built-in pack"))?;
            (id.to_string(), parse_pack(text, &name)?)
        }
        PackSource::File(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| GameError::UnreadableFile {
                path: path.clone(),
                source,
            })?;
            let id = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            (id, parse_pack(&text, &name)?)
        }
    };

    info!("loaded pack {} ({} levels)", name, levels.len());
    Ok(LevelPack { id, source, levels })
}

/// Load every source in order. The first failure aborts the whole catalog.
pub fn load_catalog(sources: Vec<PackSource>) -> GameResult<Vec<LevelPack>> {
    sources.into_iter().map(load_pack).collect()
}

/// Built-in packs, then `cli_paths`, then `*.lvl` files in `packs_dir`,
/// capped at `MAX_PACK_COUNT`.
pub fn discover_sources(cli_paths: &[PathBuf], packs_dir: Option<&Path>) -> Vec<PackSource> {
    let mut sources: Vec<PackSource> = BUILTIN_PACKS
        .iter()
        .map(|&(id, _)| PackSource::Builtin(id))
        .collect();

    sources.extend(cli_paths.iter().cloned().map(PackSource::File));

    if let Some(dir) = packs_dir {
        for path in scan_pack_dir(dir) {
            if !sources.iter().any(|s| matches!(s, PackSource::File(p) if same_file(p, &path))) {
                sources.push(PackSource::File(path));
            }
        }
    }

    if sources.len() > MAX_PACK_COUNT {
        for dropped in &sources[MAX_PACK_COUNT..] {
            warn!("ignoring level pack {}: at most {} packs are supported", dropped.display_name(), MAX_PACK_COUNT);
        }
        sources.truncate(MAX_PACK_COUNT);
    }
    sources
}

/// Parse pack text into level templates. `pack` names the pack in errors.
pub fn parse_pack(text: &str, pack: &str) -> GameResult<Vec<Grid>> {
    let total_lines = text.lines().count();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim_end()));

    let (_, header) = lines
        .next()
        .ok_or_else(|| GameError::format(pack, 1, "file is empty"))?;
    let count_str = header
        .trim()
        .strip_prefix("Levels:")
        .ok_or_else(|| GameError::format(pack, 1, "missing \"Levels: N\" header"))?
        .trim();
    let count: usize = count_str
        .parse()
        .map_err(|_| GameError::format(pack, 1, format!("invalid level count \"{count_str}\"")))?;
    if count > MAX_LEVELS_PER_PACK {
        return Err(GameError::TooManyLevels {
            pack: pack.to_string(),
            count,
            max: MAX_LEVELS_PER_PACK,
        });
    }

    let mut levels = Vec::with_capacity(count);

    // Blank lines separate level blocks; inside a block every line is a row.
    for index in 0..count {
        let (line_no, dims) = lines.find(|(_, l)| !l.trim().is_empty()).ok_or_else(|| {
            GameError::format(pack, total_lines, format!("expected {count} levels, found {index}"))
        })?;
        let (width, height) = parse_dimensions(dims)
            .ok_or_else(|| GameError::format(pack, line_no, format!("expected \"w: W, h: H\", found \"{}\"", dims.trim())))?;
        if width == 0 || height == 0 {
            return Err(GameError::format(pack, line_no, "level dimensions must be non-zero"));
        }
        if width > PLAYFIELD_WIDTH || height >= PLAYFIELD_HEIGHT {
            return Err(GameError::OversizedLevel {
                pack: pack.to_string(),
                level: index + 1,
                width,
                height,
                max_width: PLAYFIELD_WIDTH,
                max_height_exclusive: PLAYFIELD_HEIGHT,
            });
        }

        let mut grid = Grid::new(width, height);
        for y in 0..height {
            let (row_no, row) = lines.next().ok_or_else(|| {
                GameError::format(pack, total_lines, format!("level {} ends after {y} of {height} rows", index + 1))
            })?;
            let row_len = row.chars().count();
            if row_len > width {
                return Err(GameError::format(pack, row_no, format!("row is {row_len} wide, level width is {width}")));
            }
            for (x, c) in row.chars().enumerate() {
                grid.set(Position::new(x, y), Tile::from_char(c));
            }
        }

        let players = grid.count(Tile::Player);
        if players != 1 {
            return Err(GameError::format(pack, line_no, format!("level {} has {players} players, expected exactly one", index + 1)));
        }

        debug!("{pack}: level {} is {width}x{height}", index + 1);
        levels.push(grid);
    }

    if let Some((line_no, _)) = lines.find(|(_, l)| !l.trim().is_empty()) {
        return Err(GameError::format(pack, line_no, "unexpected data after the last level"));
    }

    Ok(levels)
}

// ══════════════════════════════════════════════════════════════
// Internal helpers
// ══════════════════════════════════════════════════════════════

/// `w: W, h: H` → (W, H)
fn parse_dimensions(line: &str) -> Option<(usize, usize)> {
    let rest = line.trim().strip_prefix("w:")?;
    let (w, h) = rest.split_once(',')?;
    let h = h.trim().strip_prefix("h:")?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// `*.lvl` files directly inside `dir`, sorted by file name.
fn scan_pack_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == PACK_EXTENSION))
        .collect();
    paths.sort();
    paths
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn builtin_text(id: &str) -> Option<&'static str> {
    BUILTIN_PACKS.iter().find(|(name, _)| *name == id).map(|(_, text)| *text)
}

// ══════════════════════════════════════════════════════════════
// Built-in packs
// ══════════════════════════════════════════════════════════════

pub const TUTORIAL_PACK_ID: &str = "tutorial";
pub const SPECIAL_PACK_ID: &str = "special";

const BUILTIN_PACKS: &[(&str, &str)] = &[
    (TUTORIAL_PACK_ID, TUTORIAL_PACK),
    ("main", MAIN_PACK),
    (SPECIAL_PACK_ID, SPECIAL_PACK),
    ("demon", DEMON_PACK),
];

const TUTORIAL_PACK: &str = "\
Levels: 6

w: 9, h: 3
#########
#P---@x-#
#########

w: 9, h: 4
#########
#P-@-x--#
#--@-x--#
#########

w: 9, h: 4
#########
#P-@-x+-#
#-------#
#########

w: 9, h: 4
#########
#P-@-x--#
#---@---#
#########

w: 10, h: 4
##########
#P-->-@x-#
#----<---#
##########

w: 9, h: 5
#########
#P-->-x-#
#--@----#
#-------#
#########
";

const MAIN_PACK: &str = "\
Levels: 5

w: 8, h: 7
########
#--x---#
#--@---#
#-P-@x-#
#------#
#------#
########

w: 9, h: 6
#########
#---#---#
#-@---@-#
#--#P#--#
#x-----x#
#########

w: 10, h: 5
##########
#P--#----#
#-@->-@x-#
#---#-@x-#
##########

w: 11, h: 6
###########
#P---#----#
#-*--=-@x-#
#-@--#----#
#x---#----#
###########

w: 8, h: 7
########
#x-----#
#-@##--#
#--P-@-#
#-##-x-#
#------#
########
";

const SPECIAL_PACK: &str = "\
Levels: 3

w: 10, h: 3
##########
#P*-=@x--#
##########

w: 10, h: 3
##########
#P*=-*=@x#
##########

w: 8, h: 6
########
#------#
#P-~-=-#
#--@---#
#------#
########
";

const DEMON_PACK: &str = "\
Levels: 3

w: 9, h: 7
#########
#-------#
#-@-@-@-#
#x#-P-#x#
#---x---#
#---#---#
#########

w: 11, h: 5
###########
#P-*-=--@x#
#---#v#---#
#-@-----x-#
###########

w: 7, h: 5
#######
#P-@-x#
#-*=--#
#x-@--#
#######
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_levels_with_legend() {
        let text = "Levels: 3\n\nw: 3, h: 1\nP@x\n\nw: 2, h: 2\n#P\n<>\n\nw: 4, h: 1\nP*=~\n";
        let levels = parse_pack(text, "t").unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!((levels[0].width(), levels[0].height()), (3, 1));
        assert_eq!(levels[0].row(0), &[Tile::Player, Tile::Box, Tile::Goal]);
        assert_eq!((levels[1].width(), levels[1].height()), (2, 2));
        assert_eq!(levels[1].row(1), &[Tile::OneWayLeft, Tile::OneWayRight]);
        assert_eq!(levels[2].row(0), &[Tile::Player, Tile::Key, Tile::LockedDoor, Tile::KeyInGoal]);
    }

    #[test]
    fn spaces_are_empty_and_short_rows_are_padded() {
        let levels = parse_pack("Levels: 1\nw: 4, h: 2\nP x\n #\n", "t").unwrap();
        assert_eq!(levels[0].row(0), &[Tile::Player, Tile::Empty, Tile::Goal, Tile::Empty]);
        assert_eq!(levels[0].row(1), &[Tile::Empty, Tile::Wall, Tile::Empty, Tile::Empty]);
    }

    #[test]
    fn blank_rows_inside_a_level_are_empty() {
        let text = "Levels: 2\n\nw: 3, h: 2\nP@x\n   \n\nw: 2, h: 2\nP-\n  \n";
        let levels = parse_pack(text, "t").unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].row(1), &[Tile::Empty; 3]);
        assert_eq!(levels[1].row(0), &[Tile::Player, Tile::Empty]);
        assert_eq!(levels[1].row(1), &[Tile::Empty; 2]);

        // Trimmed to nothing by an editor, still a row.
        let levels = parse_pack("Levels: 1\nw: 3, h: 3\nP@x\n\n###\n", "t").unwrap();
        assert_eq!(levels[0].row(1), &[Tile::Empty; 3]);
        assert_eq!(levels[0].row(2), &[Tile::Wall; 3]);
    }

    #[test]
    fn missing_header_is_format_error() {
        let err = parse_pack("w: 3, h: 1\nP@x\n", "t").unwrap_err();
        assert!(matches!(err, GameError::Format { line: 1, .. }));
        let err = parse_pack("Levels: many\n", "t").unwrap_err();
        assert!(matches!(err, GameError::Format { .. }));
        let err = parse_pack("", "t").unwrap_err();
        assert!(matches!(err, GameError::Format { .. }));
    }

    #[test]
    fn too_many_levels() {
        let err = parse_pack("Levels: 193\n", "t").unwrap_err();
        assert!(matches!(err, GameError::TooManyLevels { count: 193, max: 192, .. }));
    }

    #[test]
    fn oversized_levels() {
        let err = parse_pack("Levels: 1\nw: 75, h: 3\n", "t").unwrap_err();
        assert!(matches!(err, GameError::OversizedLevel { width: 75, .. }));
        // Height limit is exclusive.
        let err = parse_pack("Levels: 1\nw: 3, h: 23\n", "t").unwrap_err();
        assert!(matches!(err, GameError::OversizedLevel { height: 23, .. }));
    }

    #[test]
    fn largest_level_fits() {
        let mut text = String::from("Levels: 1\nw: 74, h: 22\n");
        text.push('P');
        text.push_str(&"-".repeat(73));
        text.push('\n');
        for _ in 1..22 {
            text.push_str(&"#".repeat(74));
            text.push('\n');
        }
        let levels = parse_pack(&text, "t").unwrap();
        assert_eq!((levels[0].width(), levels[0].height()), (74, 22));
    }

    #[test]
    fn early_eof_is_format_error() {
        assert!(matches!(
            parse_pack("Levels: 2\nw: 1, h: 1\nP\n", "t"),
            Err(GameError::Format { .. })
        ));
        assert!(matches!(
            parse_pack("Levels: 1\nw: 1, h: 2\nP\n", "t"),
            Err(GameError::Format { .. })
        ));
    }

    #[test]
    fn trailing_data_is_format_error() {
        let err = parse_pack("Levels: 1\nw: 1, h: 1\nP\n\nw: 1, h: 1\n", "t").unwrap_err();
        assert!(matches!(err, GameError::Format { line: 5, .. }));
    }

    #[test]
    fn long_row_is_format_error() {
        let err = parse_pack("Levels: 1\nw: 2, h: 1\nP--\n", "t").unwrap_err();
        assert!(matches!(err, GameError::Format { line: 3, .. }));
    }

    #[test]
    fn bad_dimensions_are_format_errors() {
        assert!(matches!(parse_pack("Levels: 1\nwidth 3\n", "t"), Err(GameError::Format { .. })));
        assert!(matches!(parse_pack("Levels: 1\nw: 0, h: 1\n", "t"), Err(GameError::Format { .. })));
    }

    #[test]
    fn level_needs_exactly_one_player() {
        assert!(matches!(parse_pack("Levels: 1\nw: 2, h: 1\n@x\n", "t"), Err(GameError::Format { .. })));
        assert!(matches!(parse_pack("Levels: 1\nw: 2, h: 1\nPP\n", "t"), Err(GameError::Format { .. })));
    }

    #[test]
    fn builtin_packs_are_valid() {
        for &(id, _) in BUILTIN_PACKS {
            let pack = load_pack(PackSource::Builtin(id)).unwrap();
            assert!(pack.level_count() > 0, "{id} has no levels");
            assert_eq!(pack.id, id);
        }
    }

    #[test]
    fn unreadable_file() {
        let err = load_pack(PackSource::File(PathBuf::from("/definitely/not/here.lvl"))).unwrap_err();
        assert!(matches!(err, GameError::UnreadableFile { .. }));
    }

    #[test]
    fn file_pack_id_is_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.lvl");
        std::fs::write(&path, "Levels: 1\nw: 2, h: 1\nP-\n").unwrap();
        let pack = load_pack(PackSource::File(path.clone())).unwrap();
        assert_eq!(pack.id, "extra");
        assert_eq!(pack.source, PackSource::File(path));
    }

    #[test]
    fn discovery_orders_builtins_cli_then_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.lvl"), "").unwrap();
        std::fs::write(dir.path().join("a.lvl"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let cli = vec![PathBuf::from("/tmp/cli.lvl")];

        let sources = discover_sources(&cli, Some(dir.path()));
        let n = BUILTIN_PACKS.len();
        assert_eq!(sources.len(), n + 3);
        assert_eq!(sources[0], PackSource::Builtin(TUTORIAL_PACK_ID));
        assert_eq!(sources[n], PackSource::File(PathBuf::from("/tmp/cli.lvl")));
        assert_eq!(sources[n + 1], PackSource::File(dir.path().join("a.lvl")));
        assert_eq!(sources[n + 2], PackSource::File(dir.path().join("b.lvl")));
    }

    #[test]
    fn discovery_caps_pack_count() {
        let cli: Vec<PathBuf> = (0..100).map(|i| PathBuf::from(format!("p{i}.lvl"))).collect();
        let sources = discover_sources(&cli, None);
        assert_eq!(sources.len(), MAX_PACK_COUNT);
    }

    #[test]
    fn catalog_aborts_on_first_bad_pack() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.lvl");
        std::fs::write(&bad, "Levels: 1\n").unwrap();
        let result = load_catalog(vec![PackSource::Builtin("main"), PackSource::File(bad)]);
        assert!(matches!(result, Err(GameError::Format { .. })));
    }
}
