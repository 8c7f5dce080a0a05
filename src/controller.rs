//! Per-turn orchestration: opening book on the first move, search otherwise.

use log::{error, info, warn};

use crate::board::{Board, Move, Side};
use crate::book::{GameResult, OpeningBook};
use crate::config::AgentConfig;
use crate::error::{KalahaError, KalahaResult};
use crate::search::{fallback_move, Searcher};

/// What the game server tells the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The server assigns our side for the coming game.
    Hello(Side),
    /// Our turn; carries the board snapshot to decide on.
    YourTurn(String),
    /// Game finished; `None` means a draw.
    GameOver(Option<Side>),
}

/// Connection to whatever referees the game.
pub trait Transport {
    fn next_event(&mut self) -> KalahaResult<GameEvent>;
    fn send_move(&mut self, mv: Move) -> KalahaResult<()>;
}

/// State that lives for exactly one game.
#[derive(Debug, Clone)]
pub struct GameSession {
    player: Side,
    moves_made: u32,
    opening: Option<Move>,
    finished: bool,
}

impl GameSession {
    pub fn new(player: Side) -> Self {
        Self {
            player,
            moves_made: 0,
            opening: None,
            finished: false,
        }
    }

    pub fn player(&self) -> Side {
        self.player
    }

    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    /// First move this side played, whatever chose it.
    pub fn opening_move(&self) -> Option<Move> {
        self.opening
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

struct BookSlot {
    book: OpeningBook,
    side: Side,
}

pub struct TurnController {
    searcher: Searcher,
    book: Option<BookSlot>,
    /// Side we play, once configured or announced by the server.
    player: Option<Side>,
    session: Option<GameSession>,
}

impl TurnController {
    /// Controller that plays `player` unless the server announces otherwise.
    pub fn new(config: AgentConfig, player: Side) -> Self {
        Self::from_config(AgentConfig {
            player: Some(player),
            ..config
        })
    }

    /// Controller whose side comes from `config.player`. When that is unset
    /// the side is learned from a [`GameEvent::Hello`] or, failing that, from
    /// the side to move in the first snapshot of each game.
    pub fn from_config(config: AgentConfig) -> Self {
        let book = config.book.map(|cfg| BookSlot {
            book: OpeningBook::open(cfg.path),
            side: cfg.side,
        });
        let player = config.player;
        Self {
            searcher: Searcher::new(config.search),
            book,
            player,
            session: player.map(GameSession::new),
        }
    }

    /// Replace the configured book, e.g. with a seeded one.
    pub fn with_book(mut self, book: OpeningBook, side: Side) -> Self {
        self.book = Some(BookSlot { book, side });
        self
    }

    pub fn player(&self) -> Option<Side> {
        self.player
    }

    /// Current (or just finished) game; `None` until our side is known.
    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    /// Drop the previous game's state.
    pub fn new_game(&mut self) {
        self.session = self.player.map(GameSession::new);
    }

    /// Take the side the server assigned and start a fresh session for it.
    pub fn identify(&mut self, side: Side) {
        if let Some(configured) = self.player.filter(|&p| p != side) {
            warn!("configured as {configured} but the server assigned {side}");
        }
        info!("playing as {side}");
        self.player = Some(side);
        self.session = Some(GameSession::new(side));
    }

    /// Choose a move for `snapshot`. The move is always legal on that board.
    pub fn decide(&mut self, snapshot: &str) -> KalahaResult<Move> {
        let board = Board::from_snapshot(snapshot)?;
        let mut session = match self.session.take() {
            Some(session) => session,
            None => {
                info!("no side assigned, playing {} as the board says", board.to_move());
                GameSession::new(board.to_move())
            }
        };
        if board.to_move() != session.player {
            warn!(
                "asked to move for {} but the board says {} is next",
                session.player,
                board.to_move()
            );
        }

        let chosen = match self.opening_from_book(&board, &session) {
            Some(mv) => mv,
            None => {
                let report = self.searcher.search(&board);
                info!(
                    "move {} (score {}, depth {}, {} nodes, {} ms)",
                    report.best_move, report.score, report.completed_depth, report.nodes, report.elapsed_ms
                );
                report.best_move
            }
        };

        let mv = if board.is_legal(chosen) {
            chosen
        } else {
            let fallback = fallback_move(&board);
            warn!("pit {chosen} is empty, playing pit {fallback} instead");
            fallback
        };

        if session.moves_made == 0 {
            session.opening = Some(mv);
        }
        session.moves_made += 1;
        self.session = Some(session);
        Ok(mv)
    }

    fn opening_from_book(&mut self, board: &Board, session: &GameSession) -> Option<Move> {
        if session.moves_made != 0 {
            return None;
        }
        let slot = self.book.as_mut()?;
        if slot.side != session.player {
            return None;
        }
        match slot.book.suggest() {
            Ok(mv) if board.is_legal(mv) => Some(mv),
            Ok(mv) => {
                warn!("opening book suggested empty pit {mv}, searching instead");
                None
            }
            Err(err) => {
                warn!(
                    "opening book {} unavailable ({err}), searching instead",
                    slot.book.path().display()
                );
                None
            }
        }
    }

    /// Close the session and feed the result back to the opening book.
    /// `None` when the game ended before our side was known.
    pub fn finish(&mut self, winner: Option<Side>) -> Option<GameResult> {
        let Some(session) = self.session.as_mut() else {
            warn!("game over before we knew our side, nothing to record");
            return None;
        };
        session.finished = true;
        let player = session.player;
        let result = GameResult::for_side(winner, player);
        info!("game over for {player}: {result:?}");

        let (Some(slot), Some(opening)) = (&self.book, session.opening) else {
            return Some(result);
        };
        if slot.side == player {
            if let Err(err) = slot.book.record_outcome(opening, result) {
                warn!("could not update opening book {}: {err}", slot.book.path().display());
            }
        }
        Some(result)
    }

    /// Play one game over `transport`, starting from a fresh session. A
    /// malformed snapshot skips that turn; transport failures end the game.
    pub fn run<T: Transport>(&mut self, transport: &mut T) -> KalahaResult<Option<GameResult>> {
        self.new_game();
        loop {
            match transport.next_event()? {
                GameEvent::Hello(side) => self.identify(side),
                GameEvent::YourTurn(snapshot) => match self.decide(&snapshot) {
                    Ok(mv) => transport.send_move(mv)?,
                    Err(err @ (KalahaError::MalformedSnapshot { .. } | KalahaError::SeedCount { .. })) => {
                        error!("rejected board {snapshot:?}: {err}");
                    }
                    Err(err) => return Err(err),
                },
                GameEvent::GameOver(winner) => return Ok(self.finish(winner)),
            }
        }
    }
}
