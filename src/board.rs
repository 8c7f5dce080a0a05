use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use wasm_bindgen::prelude::*;

use crate::error::{KalahaError, KalahaResult};

pub const PITS_PER_SIDE: usize = 6;
pub const SEEDS_PER_PIT: u8 = 4;
pub const TOTAL_SEEDS: u32 = 2 * PITS_PER_SIDE as u32 * SEEDS_PER_PIT as u32; // 48
pub const NUM_PLAYERS: usize = 2;

/// Sowing positions seen from the mover: six own pits, own store, six opposing pits.
/// The opposing store is never part of the cycle.
const SOW_CYCLE: usize = 2 * PITS_PER_SIDE + 1;
const OWN_STORE: usize = PITS_PER_SIDE;
const SNAPSHOT_FIELDS: usize = 2 * (PITS_PER_SIDE + 1) + 1;

/// Legal move list, never more than six entries.
pub type MoveList = SmallVec<[Move; PITS_PER_SIDE]>;

/// One of the two players, numbered 1 and 2 as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    One,
    Two,
}

impl Side {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    #[inline]
    pub const fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl TryFrom<u8> for Side {
    type Error = KalahaError;

    fn try_from(value: u8) -> KalahaResult<Self> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(KalahaError::MalformedSnapshot {
                reason: format!("player must be 1 or 2, got {other}"),
            }),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side.number()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// A pit of the side to move, 1..=6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Move(u8);

impl Move {
    /// Every move in increasing pit order.
    pub const ALL: [Move; PITS_PER_SIDE] = [Move(1), Move(2), Move(3), Move(4), Move(5), Move(6)];

    pub fn new(pit: u8) -> KalahaResult<Move> {
        if (1..=PITS_PER_SIDE as u8).contains(&pit) {
            Ok(Move(pit))
        } else {
            Err(KalahaError::InvalidMove { pit })
        }
    }

    #[inline]
    pub const fn pit(self) -> u8 {
        self.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Winner(Side),
    Draw,
}

/// Pit index `i` on one side faces pit `7 - i` on the other.
#[inline]
const fn facing(index: usize) -> usize {
    PITS_PER_SIDE - 1 - index
}

/// Immutable Kalaha position: pits and store per side plus the side to move.
///
/// Every move produces a new value through [`Board::apply`]; nothing mutates a
/// board that another caller can observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    pits: [[u8; PITS_PER_SIDE]; NUM_PLAYERS],
    stores: [u8; NUM_PLAYERS],
    to_move: Side,
}

impl Board {
    /// Opening position: four seeds in every pit, empty stores.
    pub fn initial(first: Side) -> Self {
        Self {
            pits: [[SEEDS_PER_PIT; PITS_PER_SIDE]; NUM_PLAYERS],
            stores: [0; NUM_PLAYERS],
            to_move: first,
        }
    }

    /// Build a board from raw counts, enforcing seed conservation.
    pub fn from_parts(
        pits_one: [u8; PITS_PER_SIDE],
        store_one: u8,
        pits_two: [u8; PITS_PER_SIDE],
        store_two: u8,
        to_move: Side,
    ) -> KalahaResult<Self> {
        let board = Self {
            pits: [pits_one, pits_two],
            stores: [store_one, store_two],
            to_move,
        };
        let found = board.total_seeds();
        if found != TOTAL_SEEDS {
            return Err(KalahaError::SeedCount {
                found,
                expected: TOTAL_SEEDS,
            });
        }
        Ok(board)
    }

    /// Decode `A1;..;A6;storeA;B1;..;B6;storeB;next`.
    pub fn from_snapshot(snapshot: &str) -> KalahaResult<Self> {
        let mut tokens: Vec<&str> = snapshot.trim().split(';').map(str::trim).collect();
        if tokens.last() == Some(&"") {
            tokens.pop();
        }
        if tokens.len() != SNAPSHOT_FIELDS {
            return Err(KalahaError::MalformedSnapshot {
                reason: format!("expected {SNAPSHOT_FIELDS} fields, got {}", tokens.len()),
            });
        }

        let Some((next, counts)) = tokens.split_last() else {
            return Err(KalahaError::MalformedSnapshot {
                reason: "empty snapshot".to_string(),
            });
        };
        let to_move = next
            .parse::<u8>()
            .map_err(|_| KalahaError::MalformedSnapshot {
                reason: format!("side to move {next:?} is not 1 or 2"),
            })
            .and_then(Side::try_from)?;

        let mut values = [0u8; SNAPSHOT_FIELDS - 1];
        for (slot, token) in values.iter_mut().zip(counts) {
            let parsed: u32 = token.parse().map_err(|_| KalahaError::MalformedSnapshot {
                reason: format!("field {token:?} is not a seed count"),
            })?;
            if parsed > TOTAL_SEEDS {
                return Err(KalahaError::SeedCount {
                    found: parsed,
                    expected: TOTAL_SEEDS,
                });
            }
            *slot = parsed as u8;
        }

        let mut pits_one = [0u8; PITS_PER_SIDE];
        let mut pits_two = [0u8; PITS_PER_SIDE];
        pits_one.copy_from_slice(&values[..PITS_PER_SIDE]);
        pits_two.copy_from_slice(&values[PITS_PER_SIDE + 1..2 * PITS_PER_SIDE + 1]);

        Self::from_parts(
            pits_one,
            values[OWN_STORE],
            pits_two,
            values[2 * PITS_PER_SIDE + 1],
            to_move,
        )
    }

    pub fn to_snapshot(&self) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(SNAPSHOT_FIELDS);
        for side in [Side::One, Side::Two] {
            fields.extend(self.pits[side.index()].iter().map(u8::to_string));
            fields.push(self.stores[side.index()].to_string());
        }
        fields.push(self.to_move.number().to_string());
        fields.join(";")
    }

    #[inline]
    pub fn to_move(&self) -> Side {
        self.to_move
    }

    #[inline]
    pub fn pits(&self, side: Side) -> &[u8; PITS_PER_SIDE] {
        &self.pits[side.index()]
    }

    #[inline]
    pub fn seeds(&self, side: Side, mv: Move) -> u8 {
        self.pits[side.index()][mv.index()]
    }

    #[inline]
    pub fn store(&self, side: Side) -> u8 {
        self.stores[side.index()]
    }

    pub fn pit_total(&self, side: Side) -> u32 {
        self.pits[side.index()].iter().map(|&s| s as u32).sum()
    }

    pub fn total_seeds(&self) -> u32 {
        self.pit_total(Side::One)
            + self.pit_total(Side::Two)
            + self.stores.iter().map(|&s| s as u32).sum::<u32>()
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.seeds(self.to_move, mv) > 0
    }

    pub fn legal_moves(&self) -> MoveList {
        Move::ALL.iter().copied().filter(|&mv| self.is_legal(mv)).collect()
    }

    /// Sow the seeds of `mv` and return the resulting position.
    ///
    /// The last seed landing in the mover's store keeps the turn; landing in an
    /// empty own pit facing a non-empty enemy pit captures both into the store.
    pub fn apply(&self, mv: Move) -> KalahaResult<Board> {
        let mover = self.to_move;
        let own = mover.index();
        let opp = mover.opponent().index();

        let mut seeds = self.pits[own][mv.index()];
        if seeds == 0 {
            return Err(KalahaError::EmptyPit { pit: mv.pit() });
        }

        let mut next = *self;
        next.pits[own][mv.index()] = 0;
        let mut position = mv.index();
        while seeds > 0 {
            position = (position + 1) % SOW_CYCLE;
            match position {
                p if p < PITS_PER_SIDE => next.pits[own][p] += 1,
                OWN_STORE => next.stores[own] += 1,
                p => next.pits[opp][p - OWN_STORE - 1] += 1,
            }
            seeds -= 1;
        }

        if position == OWN_STORE {
            return Ok(next);
        }

        if position < PITS_PER_SIDE && next.pits[own][position] == 1 {
            let across = facing(position);
            let captured = next.pits[opp][across];
            if captured > 0 {
                next.stores[own] += captured + 1;
                next.pits[own][position] = 0;
                next.pits[opp][across] = 0;
            }
        }

        next.to_move = mover.opponent();
        Ok(next)
    }

    /// True once either side has no seeds left in its pits.
    pub fn is_terminal(&self) -> bool {
        self.pit_total(Side::One) == 0 || self.pit_total(Side::Two) == 0
    }

    /// Move every seed still in a pit into its owner's store.
    pub fn swept(&self) -> Board {
        let mut next = *self;
        for side in [Side::One, Side::Two] {
            next.stores[side.index()] += self.pit_total(side) as u8;
            next.pits[side.index()] = [0; PITS_PER_SIDE];
        }
        next
    }

    /// Final result, if the game is over.
    pub fn verdict(&self) -> Option<Verdict> {
        if !self.is_terminal() {
            return None;
        }
        let done = self.swept();
        let (one, two) = (done.store(Side::One), done.store(Side::Two));
        Some(match one.cmp(&two) {
            std::cmp::Ordering::Greater => Verdict::Winner(Side::One),
            std::cmp::Ordering::Less => Verdict::Winner(Side::Two),
            std::cmp::Ordering::Equal => Verdict::Draw,
        })
    }

    /// Same position with the two sides' contents and the side to move swapped.
    pub fn mirrored(&self) -> Board {
        Board {
            pits: [self.pits[1], self.pits[0]],
            stores: [self.stores[1], self.stores[0]],
            to_move: self.to_move.opponent(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let two: Vec<String> = self.pits[1].iter().rev().map(|s| format!("{s:2}")).collect();
        let one: Vec<String> = self.pits[0].iter().map(|s| format!("{s:2}")).collect();
        writeln!(f, "   {}", two.join(" "))?;
        writeln!(f, "{:2}{}{:2}", self.stores[1], " ".repeat(3 * PITS_PER_SIDE + 1), self.stores[0])?;
        write!(f, "   {}   ({} to move)", one.join(" "), self.to_move)
    }
}

fn to_js_error(err: KalahaError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A thin wasm-bindgen friendly board wrapper.
#[wasm_bindgen]
pub struct KalahaBoard {
    state: Board,
}

#[wasm_bindgen]
impl KalahaBoard {
    /// Decode a `;`-separated snapshot (see [`Board::from_snapshot`]).
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot: &str) -> Result<KalahaBoard, JsValue> {
        let state = Board::from_snapshot(snapshot).map_err(to_js_error)?;
        Ok(KalahaBoard { state })
    }

    /// Fresh game with `first` (1 or 2) to move.
    pub fn initial(first: u8) -> Result<KalahaBoard, JsValue> {
        let side = Side::try_from(first).map_err(to_js_error)?;
        Ok(KalahaBoard {
            state: Board::initial(side),
        })
    }

    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> String {
        self.state.to_snapshot()
    }

    /// Sow pit `pit` for the side to move and return the next player (1 or 2).
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, pit: u8) -> Result<u8, JsValue> {
        let mv = Move::new(pit).map_err(to_js_error)?;
        self.state = self.state.apply(mv).map_err(to_js_error)?;
        Ok(self.state.to_move().number())
    }

    /// Pit numbers (1-6) the side to move may sow.
    #[wasm_bindgen(js_name = validMoves)]
    pub fn valid_moves(&self) -> Vec<u8> {
        self.state.legal_moves().iter().map(|mv| mv.pit()).collect()
    }

    #[wasm_bindgen(js_name = nextPlayer)]
    pub fn next_player(&self) -> u8 {
        self.state.to_move().number()
    }

    #[wasm_bindgen(js_name = isTerminal)]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// 1 or 2 for a winner, 0 for a draw, `undefined` while the game is running.
    pub fn winner(&self) -> Option<u8> {
        self.state.verdict().map(|verdict| match verdict {
            Verdict::Winner(side) => side.number(),
            Verdict::Draw => 0,
        })
    }

    pub fn store(&self, player: u8) -> Result<u8, JsValue> {
        let side = Side::try_from(player).map_err(to_js_error)?;
        Ok(self.state.store(side))
    }

    pub fn seeds(&self, player: u8, pit: u8) -> Result<u8, JsValue> {
        let side = Side::try_from(player).map_err(to_js_error)?;
        let mv = Move::new(pit).map_err(to_js_error)?;
        Ok(self.state.seeds(side, mv))
    }
}

impl KalahaBoard {
    /// The wrapped position.
    pub fn board(&self) -> Board {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mv(pit: u8) -> Move {
        Move::new(pit).unwrap()
    }

    #[test]
    fn snapshot_roundtrip() {
        let board = Board::initial(Side::Two);
        let snapshot = board.to_snapshot();
        assert_eq!(snapshot, "4;4;4;4;4;4;0;4;4;4;4;4;4;0;2");
        assert_eq!(Board::from_snapshot(&snapshot).unwrap(), board);
        assert_eq!(Board::from_snapshot(" 4;4;4;4;4;4;0;4;4;4;4;4;4;0;2; ").unwrap(), board);
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        assert!(matches!(
            Board::from_snapshot("4;4;4"),
            Err(KalahaError::MalformedSnapshot { .. })
        ));
        assert!(matches!(
            Board::from_snapshot("4;4;4;4;4;x;0;4;4;4;4;4;4;0;1"),
            Err(KalahaError::MalformedSnapshot { .. })
        ));
        assert!(matches!(
            Board::from_snapshot("4;4;4;4;4;4;0;4;4;4;4;4;4;0;3"),
            Err(KalahaError::MalformedSnapshot { .. })
        ));
        assert!(matches!(
            Board::from_snapshot("4;4;4;4;4;4;0;4;4;4;4;4;4;0;99"),
            Err(KalahaError::MalformedSnapshot { .. })
        ));
        assert!(matches!(
            Board::from_snapshot("4;4;4;4;4;4;0;4;4;4;4;4;4;0;one"),
            Err(KalahaError::MalformedSnapshot { .. })
        ));
        assert!(matches!(
            Board::from_snapshot("4;4;4;4;4;4;1;4;4;4;4;4;4;0;1"),
            Err(KalahaError::SeedCount { found: 49, expected: 48 })
        ));
    }

    #[test]
    fn move_range_is_enforced() {
        assert!(matches!(Move::new(0), Err(KalahaError::InvalidMove { pit: 0 })));
        assert!(matches!(Move::new(7), Err(KalahaError::InvalidMove { pit: 7 })));
        assert_eq!(Move::new(6).unwrap().pit(), 6);
    }

    #[test]
    fn empty_pit_is_rejected() {
        let board = Board::from_parts([0, 4, 4, 4, 4, 4], 4, [4; 6], 0, Side::One).unwrap();
        assert!(matches!(board.apply(mv(1)), Err(KalahaError::EmptyPit { pit: 1 })));
        assert_eq!(board.legal_moves().as_slice(), &[mv(2), mv(3), mv(4), mv(5), mv(6)]);
    }

    #[test]
    fn last_seed_in_store_keeps_the_turn() {
        let board = Board::initial(Side::One);
        let next = board.apply(mv(3)).unwrap();
        assert_eq!(next.to_move(), Side::One);
        assert_eq!(next.pits(Side::One), &[4, 4, 0, 5, 5, 5]);
        assert_eq!(next.store(Side::One), 1);

        let flipped = board.apply(mv(2)).unwrap();
        assert_eq!(flipped.to_move(), Side::Two);
    }

    #[test]
    fn capture_into_empty_own_pit() {
        let board =
            Board::from_parts([1, 0, 0, 0, 0, 0], 20, [3, 3, 3, 3, 5, 3], 7, Side::One).unwrap();
        let next = board.apply(mv(1)).unwrap();
        assert_eq!(next.pits(Side::One), &[0; 6]);
        assert_eq!(next.pits(Side::Two), &[3, 3, 3, 3, 0, 3]);
        assert_eq!(next.store(Side::One), 26);
        assert_eq!(next.to_move(), Side::Two);
        assert_eq!(next.total_seeds(), TOTAL_SEEDS);
    }

    #[test]
    fn empty_opposite_pit_captures_nothing() {
        let board =
            Board::from_parts([1, 0, 0, 0, 0, 3], 20, [3, 3, 3, 3, 0, 3], 9, Side::One).unwrap();
        let next = board.apply(mv(1)).unwrap();
        assert_eq!(next.pits(Side::One), &[0, 1, 0, 0, 0, 3]);
        assert_eq!(next.store(Side::One), 20);
        assert_eq!(next.to_move(), Side::Two);
    }

    #[test]
    fn sowing_wraps_and_skips_opponent_store() {
        let board =
            Board::from_parts([2, 0, 0, 0, 0, 8], 16, [1, 1, 1, 1, 1, 1], 16, Side::One).unwrap();
        let next = board.apply(mv(6)).unwrap();
        assert_eq!(next.pits(Side::One), &[3, 0, 0, 0, 0, 0]);
        assert_eq!(next.store(Side::One), 17);
        assert_eq!(next.pits(Side::Two), &[2; 6]);
        assert_eq!(next.store(Side::Two), 16);
        assert_eq!(next.to_move(), Side::Two);
    }

    #[test]
    fn side_two_sows_into_side_one() {
        let board = Board::initial(Side::Two);
        let next = board.apply(mv(5)).unwrap();
        assert_eq!(next.pits(Side::Two), &[4, 4, 4, 4, 0, 5]);
        assert_eq!(next.store(Side::Two), 1);
        assert_eq!(next.pits(Side::One), &[5, 5, 4, 4, 4, 4]);
        assert_eq!(next.to_move(), Side::One);
    }

    #[test]
    fn terminal_board_sweeps_remaining_seeds() {
        let board = Board::from_parts([0; 6], 20, [1, 2, 3, 0, 0, 0], 22, Side::One).unwrap();
        assert!(board.is_terminal());
        let done = board.swept();
        assert_eq!(done.store(Side::Two), 28);
        assert_eq!(done.store(Side::One), 20);
        assert_eq!(board.verdict(), Some(Verdict::Winner(Side::Two)));
        assert_eq!(Board::initial(Side::One).verdict(), None);
    }

    #[test]
    fn mirrored_swaps_everything() {
        let board = Board::initial(Side::One).apply(mv(2)).unwrap();
        let mirror = board.mirrored();
        assert_eq!(mirror.pits(Side::One), board.pits(Side::Two));
        assert_eq!(mirror.store(Side::Two), board.store(Side::One));
        assert_eq!(mirror.to_move(), board.to_move().opponent());
        assert_eq!(mirror.mirrored(), board);
    }

    proptest! {
        #[test]
        fn random_playouts_conserve_seeds(choices in proptest::collection::vec(1u8..=6, 0..80)) {
            let mut board = Board::initial(Side::One);
            for pit in choices {
                if board.is_terminal() {
                    break;
                }
                let candidate = mv(pit);
                match board.apply(candidate) {
                    Ok(next) => {
                        prop_assert!(board.is_legal(candidate));
                        prop_assert_eq!(next.total_seeds(), TOTAL_SEEDS);
                        board = next;
                    }
                    Err(_) => {
                        prop_assert_eq!(board.seeds(board.to_move(), candidate), 0);
                    }
                }
            }
        }

        #[test]
        fn every_nonempty_pit_is_playable(choices in proptest::collection::vec(1u8..=6, 0..40)) {
            let mut board = Board::initial(Side::Two);
            for pit in choices {
                if let Ok(next) = board.apply(mv(pit)) {
                    board = next;
                }
            }
            for candidate in Move::ALL {
                let nonempty = board.seeds(board.to_move(), candidate) > 0;
                prop_assert_eq!(board.apply(candidate).is_ok(), nonempty);
            }
        }
    }
}
