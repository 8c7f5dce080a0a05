//! Persistent win/loss statistics for the first move of a game.
//!
//! The book file holds one row per opening pit, `move wins losses`. Counters
//! start at one each so a single early loss never rules a move out.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::{Move, Side, PITS_PER_SIDE};
use crate::error::{KalahaError, KalahaResult};

/// How a finished game went for the book-keeping side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Won,
    Lost,
    Drawn,
}

impl GameResult {
    /// `winner` is `None` for a drawn game.
    pub fn for_side(winner: Option<Side>, side: Side) -> Self {
        match winner {
            Some(w) if w == side => GameResult::Won,
            Some(_) => GameResult::Lost,
            None => GameResult::Drawn,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpeningRecord {
    pub wins: u32,
    pub losses: u32,
}

impl OpeningRecord {
    pub const NEUTRAL: OpeningRecord = OpeningRecord { wins: 1, losses: 1 };

    pub fn games(&self) -> u64 {
        self.wins as u64 + self.losses as u64
    }

    pub fn win_ratio(&self) -> f64 {
        self.wins as f64 / self.games() as f64
    }

    /// Strictly higher win ratio, compared without floating point.
    fn beats(&self, other: &OpeningRecord) -> bool {
        self.wins as u64 * other.games() > other.wins as u64 * self.games()
    }
}

/// Counters for opening moves 1..=6.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningTable {
    records: [OpeningRecord; PITS_PER_SIDE],
}

impl OpeningTable {
    pub fn neutral() -> Self {
        Self {
            records: [OpeningRecord::NEUTRAL; PITS_PER_SIDE],
        }
    }

    pub fn record(&self, mv: Move) -> OpeningRecord {
        self.records[mv.pit() as usize - 1]
    }

    /// Move with the highest win ratio; ties go to the lowest pit.
    pub fn best_move(&self) -> Move {
        let mut best = Move::ALL[0];
        for mv in Move::ALL.into_iter().skip(1) {
            if self.record(mv).beats(&self.record(best)) {
                best = mv;
            }
        }
        best
    }

    /// Draws count against the opening move.
    pub fn record_result(&mut self, mv: Move, result: GameResult) {
        let record = &mut self.records[mv.pit() as usize - 1];
        match result {
            GameResult::Won => record.wins = record.wins.saturating_add(1),
            GameResult::Lost | GameResult::Drawn => record.losses = record.losses.saturating_add(1),
        }
    }

    pub fn parse(text: &str) -> KalahaResult<Self> {
        let mut seen: [Option<OpeningRecord>; PITS_PER_SIDE] = [None; PITS_PER_SIDE];
        let mut last_line = 0;

        for (number, raw) in text.lines().enumerate() {
            let line = number + 1;
            last_line = line;
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let fields: Vec<&str> = raw.split_whitespace().collect();
            let [mv, wins, losses] = fields.as_slice() else {
                return Err(format_error(line, format!("expected 3 columns, got {}", fields.len())));
            };

            let pit: u8 = mv
                .parse()
                .map_err(|_| format_error(line, format!("bad move {mv:?}")))?;
            let mv = Move::new(pit).map_err(|err| format_error(line, err.to_string()))?;
            let record = OpeningRecord {
                wins: parse_count(line, wins)?,
                losses: parse_count(line, losses)?,
            };
            if record.games() == 0 {
                return Err(format_error(line, format!("move {mv} has no recorded games")));
            }

            let slot = &mut seen[pit as usize - 1];
            if slot.is_some() {
                return Err(format_error(line, format!("move {mv} listed twice")));
            }
            *slot = Some(record);
        }

        let mut records = [OpeningRecord::NEUTRAL; PITS_PER_SIDE];
        for (mv, (record, found)) in Move::ALL.iter().zip(records.iter_mut().zip(seen)) {
            *record = found.ok_or_else(|| format_error(last_line, format!("move {mv} missing")))?;
        }
        Ok(Self { records })
    }

    pub fn to_text(&self) -> String {
        Move::ALL
            .iter()
            .map(|&mv| {
                let record = self.record(mv);
                format!("{} {} {}\n", mv, record.wins, record.losses)
            })
            .collect()
    }
}

impl Default for OpeningTable {
    fn default() -> Self {
        Self::neutral()
    }
}

fn format_error(line: usize, reason: String) -> KalahaError {
    KalahaError::BookFormat { line, reason }
}

fn parse_count(line: usize, token: &str) -> KalahaResult<u32> {
    token
        .parse()
        .map_err(|_| format_error(line, format!("bad counter {token:?}")))
}

/// File-backed opening book.
pub struct OpeningBook {
    path: PathBuf,
    rng: SmallRng,
}

impl OpeningBook {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the table; `None` when no book file exists yet or it is empty
    /// (e.g. truncated by an interrupted first write).
    pub fn load(&self) -> KalahaResult<Option<OpeningTable>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => OpeningTable::parse(&text).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Best opening by win ratio. Without a book file a neutral table is
    /// written and a uniformly random pit is returned instead.
    pub fn suggest(&mut self) -> KalahaResult<Move> {
        if let Some(table) = self.load()? {
            let mv = table.best_move();
            let record = table.record(mv);
            info!(
                "opening book suggests pit {mv} ({}/{} won, ratio {:.3})",
                record.wins,
                record.games(),
                record.win_ratio()
            );
            return Ok(mv);
        }

        self.store(&OpeningTable::neutral())?;
        let mv = Move::ALL[self.rng.gen_range(0..PITS_PER_SIDE)];
        info!("created opening book at {}, playing random pit {mv}", self.path.display());
        Ok(mv)
    }

    /// Count the game for `mv` and rewrite the whole table.
    pub fn record_outcome(&self, mv: Move, result: GameResult) -> KalahaResult<OpeningRecord> {
        let mut table = self.load()?.unwrap_or_default();
        table.record_result(mv, result);
        self.store(&table)?;
        let record = table.record(mv);
        debug!("opening {mv} {result:?}: now {} wins / {} losses", record.wins, record.losses);
        Ok(record)
    }

    /// Write to a sibling temporary file, then rename over the book.
    fn store(&self, table: &OpeningTable) -> KalahaResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, table.to_text())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
