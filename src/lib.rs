#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Kalaha (six pits, one store per side) decision engine, usable natively or from WebAssembly.
//!
//! The crate is organised leaf-first:
//!
//! * [`Board`] – an immutable `Copy` position. [`Board::apply`] sows one pit and returns the next
//!   position (extra turns and captures included) or rejects the move.
//! * [`Evaluator`] – pure static scoring from side One's point of view, wrapped in the tagged
//!   [`Outcome`] type so decided games never mix with heuristic numbers.
//! * [`Searcher`] – time-boxed iterative-deepening alpha-beta. A depth only replaces the previous
//!   answer once it has been searched completely.
//! * [`OpeningBook`] – flat-file win/loss counters that pick the first move of a game.
//! * [`TurnController`] – one decision per turn over any [`Transport`], with the per-game
//!   [`GameSession`].
//!
//! [`KalahaBoard`] and [`KalahaSearch`] are thin wasm-bindgen wrappers over the first three.

mod board;
mod book;
mod config;
mod controller;
mod error;
mod eval;
mod search;

pub use board::{Board, KalahaBoard, Move, MoveList, Side, Verdict, PITS_PER_SIDE, SEEDS_PER_PIT, TOTAL_SEEDS};
pub use book::{GameResult, OpeningBook, OpeningRecord, OpeningTable};
pub use config::{AgentConfig, BookConfig};
pub use controller::{GameEvent, GameSession, Transport, TurnController};
pub use error::{KalahaError, KalahaResult};
pub use eval::{Evaluator, Outcome};
pub use search::{fallback_move, KalahaSearch, SearchConfig, SearchReport, Searcher};

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook is only compiled in
/// when the `console_error_panic_hook` feature is enabled (default).
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Route engine logs to the browser console. `verbose` enables per-depth search traces.
/// Calling it again only adjusts the level.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(verbose: bool) {
    let _ = log::set_logger(&CONSOLE_LOGGER);
    log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
}

/// Pits per side (6).
#[wasm_bindgen(js_name = pitCount)]
pub fn pit_count() -> usize {
    PITS_PER_SIDE
}

/// Seeds on the board in every position (48).
#[wasm_bindgen(js_name = totalSeeds)]
pub fn total_seeds() -> u32 {
    TOTAL_SEEDS
}
