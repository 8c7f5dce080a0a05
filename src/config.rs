use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::board::Side;
use crate::error::KalahaResult;
use crate::search::SearchConfig;

/// Where the opening book lives and which side consults it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    #[serde(default = "default_book_path")]
    pub path: PathBuf,
    /// Only this side uses the book, and only for its first move.
    #[serde(default = "default_book_side")]
    pub side: Side,
}

fn default_book_path() -> PathBuf {
    PathBuf::from("kalaha-openings.txt")
}
fn default_book_side() -> Side {
    Side::One
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            path: default_book_path(),
            side: default_book_side(),
        }
    }
}

/// Agent settings, usually read from a TOML file:
///
/// ```toml
/// player = 1
///
/// [search]
/// time_budget_ms = 4500
/// evaluator = "capture_aware"
///
/// [book]
/// path = "openings.txt"
/// side = 1
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Side this agent plays. A side announced by the server wins over it;
    /// when both are absent the first board's side to move is used.
    #[serde(default)]
    pub player: Option<Side>,
    #[serde(default)]
    pub search: SearchConfig,
    /// Opening book; disabled when absent.
    #[serde(default)]
    pub book: Option<BookConfig>,
}

impl AgentConfig {
    pub fn from_toml_str(text: &str) -> KalahaResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> KalahaResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Evaluator;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AgentConfig::from_toml_str("").unwrap();
        assert!(cfg.player.is_none());
        assert!(cfg.book.is_none());
        assert_eq!(cfg.search.time_budget_ms, 5_000);
        assert_eq!(cfg.search.evaluator, Evaluator::CaptureAware);
    }

    #[test]
    fn full_config_parses() {
        let cfg = AgentConfig::from_toml_str(
            "player = 2\n[search]\ntime_budget_ms = 4500\nevaluator = \"material\"\n[book]\npath = \"openings.txt\"\nside = 2\n",
        )
        .unwrap();
        assert_eq!(cfg.player, Some(Side::Two));
        assert_eq!(cfg.search.time_budget_ms, 4_500);
        assert_eq!(cfg.search.evaluator, Evaluator::Material);
        let book = cfg.book.unwrap();
        assert_eq!(book.path, PathBuf::from("openings.txt"));
        assert_eq!(book.side, Side::Two);
    }

    #[test]
    fn book_section_defaults() {
        let cfg = AgentConfig::from_toml_str("[book]\n").unwrap();
        let book = cfg.book.unwrap();
        assert_eq!(book.side, Side::One);
        assert_eq!(book.path, PathBuf::from("kalaha-openings.txt"));
    }

    #[test]
    fn bad_side_is_rejected() {
        assert!(AgentConfig::from_toml_str("player = 3").is_err());
        assert!(AgentConfig::from_toml_str("[search]\nevaluator = \"random\"").is_err());
    }
}
