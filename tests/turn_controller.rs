use std::collections::VecDeque;
use std::path::PathBuf;

use kalaha_agent::{
    AgentConfig, BookConfig, Board, GameEvent, GameResult, KalahaResult, Move, OpeningBook, SearchConfig, Side,
    Transport, TurnController, Verdict, TOTAL_SEEDS,
};

fn shallow(depth: u32) -> AgentConfig {
    AgentConfig {
        player: None,
        search: SearchConfig {
            max_depth: Some(depth),
            ..SearchConfig::default()
        },
        book: None,
    }
}

/// Owns the authoritative board and plays the other side with its own controller.
struct Referee {
    board: Board,
    us: Side,
    /// Sent once, before the first turn.
    hello: Option<Side>,
    opponent: TurnController,
    our_moves: Vec<Move>,
}

impl Referee {
    fn new(us: Side, opponent_depth: u32) -> Self {
        Self {
            board: Board::initial(Side::One),
            us,
            hello: None,
            opponent: TurnController::new(shallow(opponent_depth), us.opponent()),
            our_moves: Vec::new(),
        }
    }

    fn announcing(mut self) -> Self {
        self.hello = Some(self.us);
        self
    }
}

impl Transport for Referee {
    fn next_event(&mut self) -> KalahaResult<GameEvent> {
        if let Some(side) = self.hello.take() {
            return Ok(GameEvent::Hello(side));
        }
        loop {
            if let Some(verdict) = self.board.verdict() {
                let winner = match verdict {
                    Verdict::Winner(side) => Some(side),
                    Verdict::Draw => None,
                };
                self.opponent.finish(winner);
                return Ok(GameEvent::GameOver(winner));
            }
            if self.board.to_move() == self.us {
                return Ok(GameEvent::YourTurn(self.board.to_snapshot()));
            }
            let mv = self.opponent.decide(&self.board.to_snapshot())?;
            self.board = self.board.apply(mv)?;
            assert_eq!(self.board.total_seeds(), TOTAL_SEEDS);
        }
    }

    fn send_move(&mut self, mv: Move) -> KalahaResult<()> {
        self.board = self.board.apply(mv)?;
        assert_eq!(self.board.total_seeds(), TOTAL_SEEDS);
        self.our_moves.push(mv);
        Ok(())
    }
}

fn scratch_book(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kalaha-it-{}-{name}.txt", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn full_game_reaches_a_verdict() {
    for us in [Side::One, Side::Two] {
        let mut referee = Referee::new(us, 1);
        let mut controller = TurnController::new(shallow(3), us);
        let result = controller.run(&mut referee).expect("game completes");

        let session = controller.session().expect("side known");
        let expected = match referee.board.verdict().expect("terminal board") {
            Verdict::Winner(side) if side == us => GameResult::Won,
            Verdict::Winner(_) => GameResult::Lost,
            Verdict::Draw => GameResult::Drawn,
        };
        assert_eq!(result, Some(expected));
        assert!(session.is_finished());
        assert_eq!(session.moves_made() as usize, referee.our_moves.len());
        assert_eq!(session.opening_move(), referee.our_moves.first().copied());
    }
}

#[test]
fn opening_book_learns_from_finished_games() {
    let path = scratch_book("learn");

    for _ in 0..2 {
        let mut referee = Referee::new(Side::One, 1);
        let book = OpeningBook::open(&path).with_seed(11);
        let mut controller = TurnController::new(shallow(2), Side::One).with_book(book, Side::One);
        controller.run(&mut referee).expect("game completes");
    }

    let table = OpeningBook::open(&path).load().unwrap().expect("book written");
    let total: u64 = Move::ALL.iter().map(|&mv| table.record(mv).games()).sum();
    // Six neutral rows plus one entry per finished game.
    assert_eq!(total, 12 + 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn book_is_ignored_for_the_other_side() {
    let path = scratch_book("other-side");
    let mut referee = Referee::new(Side::Two, 1);
    let book = OpeningBook::open(&path);
    let mut controller = TurnController::new(shallow(2), Side::Two).with_book(book, Side::One);
    controller.run(&mut referee).expect("game completes");
    assert!(!path.exists());
}

#[test]
fn announced_side_decides_book_use() {
    let path = scratch_book("announced");
    let config = AgentConfig {
        book: Some(BookConfig {
            path: path.clone(),
            side: Side::One,
        }),
        ..shallow(2)
    };
    let mut controller = TurnController::from_config(config);
    let mut referee = Referee::new(Side::Two, 1).announcing();
    let result = controller.run(&mut referee).expect("game completes");

    assert!(result.is_some());
    assert_eq!(controller.player(), Some(Side::Two));
    assert_eq!(controller.session().map(|s| s.player()), Some(Side::Two));
    assert!(!path.exists(), "side two must not touch side one's book");
}

#[test]
fn unannounced_side_is_read_from_the_board() {
    let path = scratch_book("from-board");
    let mut controller = TurnController::from_config(shallow(2)).with_book(OpeningBook::open(&path), Side::One);
    let mut referee = Referee::new(Side::Two, 1);
    controller.run(&mut referee).expect("game completes");

    assert_eq!(controller.player(), None);
    assert_eq!(controller.session().map(|s| s.player()), Some(Side::Two));
    assert!(!path.exists());
}

#[test]
fn consecutive_games_start_fresh_sessions() {
    let path = scratch_book("back-to-back");
    let book = OpeningBook::open(&path).with_seed(5);
    let mut controller = TurnController::new(shallow(2), Side::One).with_book(book, Side::One);

    let mut first = Referee::new(Side::One, 1);
    controller.run(&mut first).expect("first game completes");
    let mut second = Referee::new(Side::One, 2);
    controller.run(&mut second).expect("second game completes");

    let session = controller.session().expect("side known");
    assert_eq!(session.moves_made() as usize, second.our_moves.len());
    assert_eq!(session.opening_move(), second.our_moves.first().copied());

    // Both games went through the book, so both were recorded.
    let table = OpeningBook::open(&path).load().unwrap().expect("book written");
    let total: u64 = Move::ALL.iter().map(|&mv| table.record(mv).games()).sum();
    assert_eq!(total, 12 + 2);
    let _ = std::fs::remove_file(&path);
}

struct Scripted {
    events: VecDeque<GameEvent>,
    sent: Vec<Move>,
}

impl Transport for Scripted {
    fn next_event(&mut self) -> KalahaResult<GameEvent> {
        Ok(self.events.pop_front().unwrap_or(GameEvent::GameOver(None)))
    }

    fn send_move(&mut self, mv: Move) -> KalahaResult<()> {
        self.sent.push(mv);
        Ok(())
    }
}

#[test]
fn malformed_board_skips_the_turn() {
    let mut transport = Scripted {
        events: VecDeque::from([
            GameEvent::YourTurn("not a board".to_string()),
            GameEvent::YourTurn("0;0;0;0;0;1;23;1;0;0;0;0;0;23;1".to_string()),
            GameEvent::GameOver(Some(Side::Two)),
        ]),
        sent: Vec::new(),
    };
    let mut controller = TurnController::new(shallow(4), Side::One);
    let result = controller.run(&mut transport).unwrap();
    assert_eq!(transport.sent, vec![Move::new(6).unwrap()]);
    assert_eq!(result, Some(GameResult::Lost));
}

#[test]
fn extra_turn_keeps_the_mover() {
    let board = Board::initial(Side::One);
    let next = board.apply(Move::new(3).unwrap()).unwrap();
    assert_eq!(next.to_move(), Side::One);
}
