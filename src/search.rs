use std::time::Duration;

use instant::Instant;
use log::debug;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::board::{Board, Move, Side};
use crate::eval::{Evaluator, Outcome};

/// Deepening stops here when no explicit cap is configured. Far beyond any
/// depth reachable inside a normal time budget.
const MAX_SEARCH_DEPTH: u32 = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Wall-clock budget per decision, kept below the server's turn limit.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    /// Optional hard cap on the deepening loop.
    #[serde(default)]
    pub max_depth: Option<u32>,
    /// Optional node budget; exhausting it ends the search like the clock does.
    #[serde(default)]
    pub max_nodes: Option<u64>,
    /// Disable to run a plain full-width minimax (same result, more nodes).
    #[serde(default = "default_alpha_beta")]
    pub alpha_beta: bool,
    #[serde(default)]
    pub evaluator: Evaluator,
}

fn default_time_budget_ms() -> u64 {
    5_000
}
fn default_alpha_beta() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: default_time_budget_ms(),
            max_depth: None,
            max_nodes: None,
            alpha_beta: default_alpha_beta(),
            evaluator: Evaluator::default(),
        }
    }
}

/// Outcome of one decision.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub best_move: Move,
    /// Value of `best_move` for side One.
    pub score: Outcome,
    /// Deepest fully searched depth (0 if even depth 1 was cut short).
    pub completed_depth: u32,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub timed_out: bool,
}

/// Iterative-deepening alpha-beta over [`Board`] values.
///
/// Side One always maximises. A move that keeps the turn is searched with the
/// same role and still consumes one ply.
pub struct Searcher {
    config: SearchConfig,
    deadline: Option<Instant>,
    nodes: u64,
    timed_out: bool,
    horizon_hit: bool,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            deadline: None,
            nodes: 0,
            timed_out: false,
            horizon_hit: false,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Pick a move for the side to move on `board` within the time budget.
    ///
    /// A depth only replaces the previous answer once its root loop finished;
    /// an interrupted pass is discarded unless nothing was confirmed yet.
    pub fn search(&mut self, board: &Board) -> SearchReport {
        let started = Instant::now();
        self.deadline = Some(started + Duration::from_millis(self.config.time_budget_ms));
        self.nodes = 0;
        self.timed_out = false;

        let max_depth = self.config.max_depth.unwrap_or(MAX_SEARCH_DEPTH).max(1);
        let mut confirmed: Option<(Move, Outcome)> = None;
        let mut completed_depth = 0;

        for depth in 1..=max_depth {
            self.horizon_hit = false;
            let candidate = self.search_root(board, depth);

            if self.timed_out {
                debug!("depth {depth} abandoned after {} nodes", self.nodes);
                if confirmed.is_none() {
                    confirmed = candidate;
                }
                break;
            }

            confirmed = candidate;
            completed_depth = depth;
            let Some((best, score)) = candidate else {
                break;
            };
            debug!("depth {depth}: best {best} score {score} ({} nodes)", self.nodes);

            if !self.horizon_hit {
                debug!("game tree resolved at depth {depth}");
                break;
            }
            if self.budget_exhausted() {
                break;
            }
        }

        let (best_move, score) = confirmed.unwrap_or_else(|| {
            (fallback_move(board), self.config.evaluator.evaluate(board))
        });
        SearchReport {
            best_move,
            score,
            completed_depth,
            nodes: self.nodes,
            elapsed_ms: started.elapsed().as_millis() as u64,
            timed_out: self.timed_out,
        }
    }

    fn search_root(&mut self, board: &Board, depth: u32) -> Option<(Move, Outcome)> {
        let maximizing = board.to_move() == Side::One;
        let mut alpha = Outcome::Loss;
        let mut beta = Outcome::Win;
        let mut best: Option<(Move, Outcome)> = None;

        for mv in Move::ALL {
            let Ok(child) = board.apply(mv) else {
                continue;
            };
            let score = self.alphabeta(&child, depth - 1, alpha, beta);

            // Strict comparison: the lowest pit wins ties.
            let improves = match best {
                None => true,
                Some((_, current)) if maximizing => score > current,
                Some((_, current)) => score < current,
            };
            if improves {
                best = Some((mv, score));
            }
            if self.config.alpha_beta {
                if maximizing {
                    alpha = alpha.max(score);
                } else {
                    beta = beta.min(score);
                }
            }
            if self.timed_out {
                break;
            }
        }
        best
    }

    fn alphabeta(&mut self, board: &Board, depth: u32, mut alpha: Outcome, mut beta: Outcome) -> Outcome {
        self.nodes += 1;
        let evaluator = self.config.evaluator;

        if board.is_terminal() {
            return evaluator.evaluate(board);
        }
        if self.budget_exhausted() {
            return evaluator.evaluate(board);
        }
        if depth == 0 {
            self.horizon_hit = true;
            return evaluator.evaluate(board);
        }

        let maximizing = board.to_move() == Side::One;
        let mut best: Option<Outcome> = None;
        for mv in Move::ALL {
            let Ok(child) = board.apply(mv) else {
                continue;
            };
            let score = self.alphabeta(&child, depth - 1, alpha, beta);
            if maximizing {
                best = Some(best.map_or(score, |b| b.max(score)));
                if self.config.alpha_beta {
                    alpha = alpha.max(score);
                }
            } else {
                best = Some(best.map_or(score, |b| b.min(score)));
                if self.config.alpha_beta {
                    beta = beta.min(score);
                }
            }
            if self.timed_out || (self.config.alpha_beta && beta <= alpha) {
                break;
            }
        }
        best.unwrap_or_else(|| evaluator.evaluate(board))
    }

    fn budget_exhausted(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        if self.config.max_nodes.is_some_and(|limit| self.nodes >= limit) {
            self.timed_out = true;
        } else if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
            }
        }
        self.timed_out
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

/// Lowest legal pit, or pit 1 when the side to move has nothing to sow.
pub fn fallback_move(board: &Board) -> Move {
    board
        .legal_moves()
        .first()
        .copied()
        .unwrap_or(Move::ALL[0])
}

/// wasm-bindgen facade over [`Searcher`].
#[wasm_bindgen]
pub struct KalahaSearch {
    searcher: Searcher,
}

#[wasm_bindgen]
impl KalahaSearch {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<KalahaSearch, JsValue> {
        let cfg: SearchConfig = if config.is_undefined() || config.is_null() {
            SearchConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            searcher: Searcher::new(cfg),
        })
    }

    #[wasm_bindgen(js_name = defaultConfig)]
    pub fn default_config() -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&SearchConfig::default()).map_err(JsValue::from)
    }

    /// Search the snapshot and return the full report as a plain object.
    pub fn search(&mut self, snapshot: &str) -> Result<JsValue, JsValue> {
        let board = Board::from_snapshot(snapshot).map_err(|err| JsValue::from_str(&err.to_string()))?;
        let report = self.searcher.search(&board);
        serde_wasm_bindgen::to_value(&report).map_err(JsValue::from)
    }

    /// Search the snapshot and return only the chosen pit (1-6).
    #[wasm_bindgen(js_name = bestMove)]
    pub fn best_move(&mut self, snapshot: &str) -> Result<u8, JsValue> {
        let board = Board::from_snapshot(snapshot).map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(self.searcher.search(&board).best_move.pit())
    }
}
