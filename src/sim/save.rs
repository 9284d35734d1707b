/// Per-pack progress persistence.
///
/// ## File format:
///   ```text
///   <watermark>
///   ms<best time ms>,<best moves>     (one line per level below the watermark)
///   ```
///   `-1` marks a missing record. Lines without the `ms` prefix are the
///   legacy format storing whole seconds; they are upgraded on read to
///   `seconds * 1000 + 999` ms and written back in the current format.
///
/// ## Paths:
///   Built-in pack `<id>` → `<save dir>/<id>.lvl.sav`
///   Pack file `<path>`   → `<path>.sav`
///
/// Every save truncates and rewrites the whole file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{GameError, GameResult};
use crate::sim::level::{LevelPack, PackSource};

const SAVE_SUFFIX: &str = ".sav";
const BUILTIN_SAVE_SUFFIX: &str = ".lvl.sav";
const DATA_DIR: &str = ".local/share/sokoterm";

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

/// Best results for one level. None = no record.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LevelRecord {
    pub best_time_ms: Option<u64>,
    pub best_moves: Option<u32>,
}

/// Progress through one pack.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PackProgress {
    /// Index of the first level not yet completed. Never decreases.
    pub watermark: usize,
    /// One entry per level of the pack.
    pub records: Vec<LevelRecord>,
}

/// Which bests a completion improved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NewBests {
    pub time: bool,
    pub moves: bool,
}

/// Derived pack statistics shown on the pack selection screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PackSummary {
    /// Sum of best times, None unless every level has one.
    pub best_time_sum: Option<u64>,
    /// Sum of best moves, None unless every level has one.
    pub best_moves_sum: Option<u64>,
    pub all_beaten: bool,
}

impl PackSummary {
    /// Reported for packs whose progress can not be read.
    pub const UNKNOWN: PackSummary = PackSummary {
        best_time_sum: None,
        best_moves_sum: None,
        all_beaten: false,
    };
}

impl PackProgress {
    pub fn new(level_count: usize) -> Self {
        PackProgress {
            watermark: 0,
            records: vec![LevelRecord::default(); level_count],
        }
    }

    pub fn level_count(&self) -> usize {
        self.records.len()
    }

    pub fn all_beaten(&self) -> bool {
        self.watermark >= self.records.len()
    }

    pub fn record(&self, level: usize) -> LevelRecord {
        self.records.get(level).copied().unwrap_or_default()
    }

    /// Apply a completed attempt: raise the watermark past `level` and keep
    /// whichever of time and moves is strictly better, independently.
    pub fn record_completion(&mut self, level: usize, time_ms: u64, moves: u32) -> NewBests {
        let Some(rec) = self.records.get_mut(level) else {
            return NewBests::default();
        };

        let time = rec.best_time_ms.map_or(true, |best| time_ms < best);
        if time {
            rec.best_time_ms = Some(time_ms);
        }
        let moves_better = rec.best_moves.map_or(true, |best| moves < best);
        if moves_better {
            rec.best_moves = Some(moves);
        }

        self.watermark = self.watermark.max(level + 1);
        NewBests { time, moves: moves_better }
    }

    pub fn summary(&self) -> PackSummary {
        let best_time_sum = self.records.iter().map(|r| r.best_time_ms).sum::<Option<u64>>();
        let best_moves_sum = self
            .records
            .iter()
            .map(|r| r.best_moves.map(u64::from))
            .sum::<Option<u64>>();
        PackSummary {
            best_time_sum,
            best_moves_sum,
            all_beaten: self.all_beaten(),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Store
// ══════════════════════════════════════════════════════════════

/// Reads and writes progress files. Owns only the directory used for
/// built-in packs; pack files keep their progress next to themselves.
#[derive(Clone, Debug)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SaveStore { dir: dir.into() }
    }

    /// Pick the save directory: `configured` if given, else
    /// ~/.local/share/sokoterm, else the executable's directory when
    /// writable, else the current directory.
    pub fn locate(configured: Option<&Path>) -> Self {
        if let Some(dir) = configured {
            return SaveStore::new(dir);
        }

        if let Ok(home) = std::env::var("HOME") {
            let xdg = PathBuf::from(&home).join(DATA_DIR);
            if std::fs::create_dir_all(&xdg).is_ok() {
                return SaveStore::new(xdg);
            }
        }

        if let Ok(exe) = std::env::current_exe() {
            let resolved = exe.canonicalize().unwrap_or(exe);
            if let Some(parent) = resolved.parent() {
                let test_path = parent.join(".write_test_sokoterm");
                if std::fs::write(&test_path, "").is_ok() {
                    let _ = std::fs::remove_file(&test_path);
                    return SaveStore::new(parent);
                }
            }
        }

        SaveStore::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_path(&self, pack: &LevelPack) -> PathBuf {
        match &pack.source {
            PackSource::Builtin(id) => self.dir.join(format!("{id}{BUILTIN_SAVE_SUFFIX}")),
            PackSource::File(path) => {
                let mut name = OsString::from(path.as_os_str());
                name.push(SAVE_SUFFIX);
                PathBuf::from(name)
            }
        }
    }

    /// Read the pack's progress. A missing file is a fresh start; a file
    /// that exists but can not be read is an error.
    pub fn load_progress(&self, pack: &LevelPack) -> GameResult<PackProgress> {
        let path = self.save_path(pack);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let progress = parse_progress(&text, pack.level_count());
                info!(
                    "loaded progress for {} from {}: watermark {}",
                    pack.id,
                    path.display(),
                    progress.watermark
                );
                Ok(progress)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PackProgress::new(pack.level_count())),
            Err(source) => Err(GameError::UnreadableFile { path, source }),
        }
    }

    /// Rewrite the pack's progress file from scratch.
    pub fn save_progress(&self, pack: &LevelPack, progress: &PackProgress) -> GameResult<()> {
        let path = self.save_path(pack);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| GameError::UnwritableFile {
                path: path.clone(),
                source,
            })?;
        }
        std::fs::write(&path, serialize_progress(progress))
            .map_err(|source| GameError::UnwritableFile { path, source })
    }

    /// Pack statistics, or `PackSummary::UNKNOWN` when there is no
    /// readable progress file.
    pub fn summarize(&self, pack: &LevelPack) -> PackSummary {
        let path = self.save_path(pack);
        match std::fs::read_to_string(&path) {
            Ok(text) => parse_progress(&text, pack.level_count()).summary(),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("can not read {}: {e}", path.display());
                }
                PackSummary::UNKNOWN
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize_progress(progress: &PackProgress) -> String {
    let mut out = format!("{}\n", progress.watermark);
    for rec in progress.records.iter().take(progress.watermark) {
        let time = rec.best_time_ms.map_or(-1, |t| t as i64);
        let moves = rec.best_moves.map_or(-1, |m| m as i64);
        out.push_str(&format!("ms{time},{moves}\n"));
    }
    out
}

/// Parse a progress file for a pack of `level_count` levels.
///
/// Malformed content degrades to missing records instead of failing:
/// an unparsable watermark yields a fresh record, a bad record line
/// yields an empty record for that level.
fn parse_progress(text: &str, level_count: usize) -> PackProgress {
    let mut progress = PackProgress::new(level_count);
    let mut lines = text.lines().map(str::trim);

    let watermark: usize = match lines.next().and_then(|l| l.parse().ok()) {
        Some(w) => w,
        None => {
            warn!("progress file has no valid watermark, starting fresh");
            return progress;
        }
    };
    if watermark > level_count {
        warn!("progress watermark {watermark} exceeds level count {level_count}, resetting");
        return progress;
    }
    progress.watermark = watermark;

    let mut upgraded = 0;
    for (rec, line) in progress.records.iter_mut().take(watermark).zip(lines) {
        let (legacy, body) = match line.strip_prefix("ms") {
            Some(rest) => (false, rest),
            None => (true, line),
        };
        let Some((time, moves)) = body.split_once(',') else {
            continue;
        };
        let time = time.trim().parse::<i64>().ok().and_then(|t| u64::try_from(t).ok());
        rec.best_time_ms = if legacy {
            upgraded += 1;
            time.and_then(|secs| secs.checked_mul(1000)).and_then(|ms| ms.checked_add(999))
        } else {
            time
        };
        rec.best_moves = moves.trim().parse::<i64>().ok().and_then(|m| u32::try_from(m).ok());
    }
    if upgraded > 0 {
        info!("upgraded {upgraded} legacy progress records");
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::{load_pack, parse_pack};

    fn file_pack(dir: &Path, levels: usize) -> LevelPack {
        let mut text = format!("Levels: {levels}\n");
        for _ in 0..levels {
            text.push_str("w: 3, h: 1\nP@x\n");
        }
        let path = dir.join("test.lvl");
        std::fs::write(&path, &text).unwrap();
        assert_eq!(parse_pack(&text, "test").unwrap().len(), levels);
        load_pack(PackSource::File(path)).unwrap()
    }

    #[test]
    fn legacy_line_is_upgraded() {
        let p = parse_progress("1\n61,10\n", 3);
        assert_eq!(p.watermark, 1);
        assert_eq!(p.records[0].best_time_ms, Some(61_999));
        assert_eq!(p.records[0].best_moves, Some(10));
    }

    #[test]
    fn legacy_missing_record_stays_missing() {
        let p = parse_progress("1\n-1,-1\n", 1);
        assert_eq!(p.records[0], LevelRecord::default());
    }

    #[test]
    fn current_format_line() {
        let p = parse_progress("2\nms1234,7\nms-1,-1\n", 2);
        assert_eq!(p.records[0].best_time_ms, Some(1234));
        assert_eq!(p.records[0].best_moves, Some(7));
        assert_eq!(p.records[1], LevelRecord::default());
        assert!(p.all_beaten());
    }

    #[test]
    fn watermark_beyond_level_count_resets() {
        let p = parse_progress("5\nms1,1\n", 3);
        assert_eq!(p, PackProgress::new(3));
    }

    #[test]
    fn garbage_watermark_starts_fresh() {
        let p = parse_progress("abc\nms1,1\n", 2);
        assert_eq!(p, PackProgress::new(2));
        let p = parse_progress("", 2);
        assert_eq!(p, PackProgress::new(2));
    }

    #[test]
    fn bad_record_line_is_skipped() {
        let p = parse_progress("2\nnonsense\nms5,6\n", 2);
        assert_eq!(p.records[0], LevelRecord::default());
        assert_eq!(p.records[1].best_moves, Some(6));
    }

    #[test]
    fn serialize_writes_only_completed_levels() {
        let mut p = PackProgress::new(3);
        p.record_completion(0, 61_999, 10);
        assert_eq!(serialize_progress(&p), "1\nms61999,10\n");
    }

    #[test]
    fn completion_updates_bests_independently() {
        let mut p = PackProgress::new(2);
        assert_eq!(p.record_completion(0, 5000, 20), NewBests { time: true, moves: true });
        assert_eq!(p.record_completion(0, 4000, 25), NewBests { time: true, moves: false });
        assert_eq!(p.record_completion(0, 4500, 18), NewBests { time: false, moves: true });
        assert_eq!(p.record_completion(0, 4000, 18), NewBests { time: false, moves: false });
        assert_eq!(p.records[0].best_time_ms, Some(4000));
        assert_eq!(p.records[0].best_moves, Some(18));
    }

    #[test]
    fn watermark_never_decreases() {
        let mut p = PackProgress::new(3);
        p.record_completion(1, 1, 1);
        assert_eq!(p.watermark, 2);
        p.record_completion(0, 1, 1);
        assert_eq!(p.watermark, 2);
        p.record_completion(2, 1, 1);
        assert!(p.all_beaten());
    }

    #[test]
    fn summary_needs_every_level() {
        let mut p = PackProgress::new(2);
        p.record_completion(0, 1000, 10);
        let s = p.summary();
        assert_eq!(s.best_time_sum, None);
        assert_eq!(s.best_moves_sum, None);
        assert!(!s.all_beaten);

        p.record_completion(1, 2500, 5);
        let s = p.summary();
        assert_eq!(s.best_time_sum, Some(3500));
        assert_eq!(s.best_moves_sum, Some(15));
        assert!(s.all_beaten);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 3);
        let store = SaveStore::new(dir.path());

        let mut p = PackProgress::new(3);
        p.record_completion(0, 61_999, 10);
        p.record_completion(1, 1234, 7);
        store.save_progress(&pack, &p).unwrap();

        assert_eq!(store.load_progress(&pack).unwrap(), p);
    }

    #[test]
    fn save_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 2);
        let store = SaveStore::new(dir.path());
        std::fs::write(store.save_path(&pack), "2\nms99999999,99999\nms99999999,99999\n").unwrap();

        let mut p = PackProgress::new(2);
        p.record_completion(0, 1, 1);
        store.save_progress(&pack, &p).unwrap();

        let text = std::fs::read_to_string(store.save_path(&pack)).unwrap();
        assert_eq!(text, "1\nms1,1\n");
    }

    #[test]
    fn missing_file_is_fresh_progress_and_unknown_summary() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 2);
        let store = SaveStore::new(dir.path());

        let p = store.load_progress(&pack).unwrap();
        assert_eq!(p.watermark, 0);
        assert!(p.records.iter().all(|r| *r == LevelRecord::default()));
        assert_eq!(store.summarize(&pack), PackSummary::UNKNOWN);
    }

    #[test]
    fn summary_of_a_finished_file_pack() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 2);
        let store = SaveStore::new(dir.path());
        let path = store.save_path(&pack);
        std::fs::write(&path, "2\nms1000,3\n61,4\n").unwrap();

        let s = store.summarize(&pack);
        assert_eq!(s.best_time_sum, Some(1000 + 61_999));
        assert_eq!(s.best_moves_sum, Some(7));
        assert!(s.all_beaten);
        // Summaries never rewrite legacy records.
        assert_eq!(std::fs::read(&path).unwrap(), b"2\nms1000,3\n61,4\n");
    }

    #[test]
    fn summary_of_a_partial_file_pack() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 2);
        let store = SaveStore::new(dir.path());
        std::fs::write(store.save_path(&pack), "1\nms5,5\n").unwrap();

        let s = store.summarize(&pack);
        assert_eq!(s.best_time_sum, None);
        assert_eq!(s.best_moves_sum, None);
        assert!(!s.all_beaten);
    }

    #[test]
    fn save_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("saves"));

        let file = file_pack(dir.path(), 1);
        assert_eq!(store.save_path(&file), dir.path().join("test.lvl.sav"));

        let builtin = load_pack(PackSource::Builtin("main")).unwrap();
        assert_eq!(store.save_path(&builtin), dir.path().join("saves").join("main.lvl.sav"));
    }

    #[test]
    fn builtin_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("nested").join("saves"));
        let pack = load_pack(PackSource::Builtin("main")).unwrap();
        let mut p = PackProgress::new(pack.level_count());
        p.record_completion(0, 10, 10);
        store.save_progress(&pack, &p).unwrap();
        assert_eq!(store.load_progress(&pack).unwrap(), p);
    }

    #[test]
    fn unreadable_save_is_error_but_summary_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 1);
        let store = SaveStore::new(dir.path());
        // A directory where the file should be can not be read as text.
        std::fs::create_dir(store.save_path(&pack)).unwrap();

        assert!(matches!(store.load_progress(&pack), Err(GameError::UnreadableFile { .. })));
        assert_eq!(store.summarize(&pack), PackSummary::UNKNOWN);
    }

    #[test]
    fn write_failure_is_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let pack = file_pack(dir.path(), 1);
        let store = SaveStore::new(dir.path());
        std::fs::create_dir(store.save_path(&pack)).unwrap();

        let err = store.save_progress(&pack, &PackProgress::new(1)).unwrap_err();
        assert!(matches!(err, GameError::UnwritableFile { .. }));
    }
}
