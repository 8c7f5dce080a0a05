//! Static position evaluation.
//!
//! Scores are always from side One's point of view: larger is better for side
//! One regardless of which side is searching.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Side, Verdict, PITS_PER_SIDE};

/// Store seeds are already secured and count double.
const STORE_WEIGHT: i32 = 2;

/// Search value with decided games kept apart from heuristic scores.
///
/// Ordering is `Loss < Score(_) < Win`; `Draw` ranks with `Score(0)`.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Loss,
    Draw,
    Score(i32),
    Win,
}

impl Outcome {
    fn rank(self) -> (i8, i32) {
        match self {
            Outcome::Loss => (-1, 0),
            Outcome::Draw => (0, 0),
            Outcome::Score(value) => (0, value),
            Outcome::Win => (1, 0),
        }
    }

    /// Value of a finished game for side One.
    pub fn from_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Winner(Side::One) => Outcome::Win,
            Verdict::Winner(Side::Two) => Outcome::Loss,
            Verdict::Draw => Outcome::Draw,
        }
    }

    /// Same value seen from the other side.
    pub fn negated(self) -> Self {
        match self {
            Outcome::Loss => Outcome::Win,
            Outcome::Win => Outcome::Loss,
            Outcome::Draw => Outcome::Draw,
            Outcome::Score(value) => Outcome::Score(-value),
        }
    }
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for Outcome {}

impl PartialOrd for Outcome {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Outcome {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Loss => write!(f, "loss"),
            Outcome::Draw => write!(f, "draw"),
            Outcome::Score(value) => write!(f, "{value:+}"),
            Outcome::Win => write!(f, "win"),
        }
    }
}

/// Available static evaluators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluator {
    /// Pits plus twice the store, per side.
    Material,
    /// Material plus the capture the side to move could make next.
    #[default]
    CaptureAware,
}

impl Evaluator {
    /// Heuristic difference (side One minus side Two). Terminal boards are
    /// swept first so stranded seeds count for their owner.
    pub fn score(self, board: &Board) -> i32 {
        let board = if board.is_terminal() { board.swept() } else { *board };
        let mut one = material(&board, Side::One);
        let mut two = material(&board, Side::Two);

        if self == Evaluator::CaptureAware && !board.is_terminal() {
            let mover = board.to_move();
            let bonus = capture_threat(&board, mover);
            match mover {
                Side::One => {
                    one += bonus;
                    two -= bonus;
                }
                Side::Two => {
                    two += bonus;
                    one -= bonus;
                }
            }
        }

        one - two
    }

    /// Search value of `board`: decided for finished games, heuristic otherwise.
    pub fn evaluate(self, board: &Board) -> Outcome {
        match board.verdict() {
            Some(verdict) => Outcome::from_verdict(verdict),
            None => Outcome::Score(self.score(board)),
        }
    }
}

fn material(board: &Board, side: Side) -> i32 {
    board.pit_total(side) as i32 + STORE_WEIGHT * board.store(side) as i32
}

/// Seeds `side` could take with one sowing that ends in an empty own pit.
///
/// Only sowings from an earlier pit that land without wrapping are considered;
/// each empty pit is credited at most once.
fn capture_threat(board: &Board, side: Side) -> i32 {
    let own = board.pits(side);
    let theirs = board.pits(side.opponent());
    let mut bonus = 0;
    for target in 0..PITS_PER_SIDE {
        let across = theirs[PITS_PER_SIDE - 1 - target];
        if own[target] != 0 || across == 0 {
            continue;
        }
        let reachable = (0..target).any(|from| own[from] as usize == target - from);
        if reachable {
            bonus += across as i32;
        }
    }
    bonus
}
