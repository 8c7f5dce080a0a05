//! Play one Kalaha game over stdin/stdout.
//!
//! Usage: `kalaha-stdio [config.toml]`
//!
//! Input lines:
//! * `player <1|2>` – the side we play this game; without it the side comes
//!   from the config file, or else from the first board we are sent
//! * `board <snapshot>` – our turn, e.g. `board 4;4;4;4;4;4;0;4;4;4;4;4;4;0;1`
//! * `winner <0|1|2>` – game over, `0` for a draw
//!
//! Each decision is answered with `move <pit>`. Logging goes to stderr and is
//! controlled by `RUST_LOG`.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use kalaha_agent::{AgentConfig, GameEvent, KalahaError, KalahaResult, Move, Side, Transport, TurnController};
use log::{error, warn};

struct StdioTransport<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Transport for StdioTransport<R, W> {
    fn next_event(&mut self) -> KalahaResult<GameEvent> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(KalahaError::Transport {
                    message: "input closed before the game ended".to_string(),
                });
            }
            let (command, rest) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
            match command {
                "player" => match rest.trim().parse::<u8>().map(Side::try_from) {
                    Ok(Ok(side)) => return Ok(GameEvent::Hello(side)),
                    _ => warn!("ignoring unknown player {:?}", rest.trim()),
                },
                "board" => return Ok(GameEvent::YourTurn(rest.trim().to_string())),
                "winner" => match rest.trim() {
                    "0" => return Ok(GameEvent::GameOver(None)),
                    "1" => return Ok(GameEvent::GameOver(Some(Side::One))),
                    "2" => return Ok(GameEvent::GameOver(Some(Side::Two))),
                    other => warn!("ignoring unknown winner {other:?}"),
                },
                "" => {}
                other => warn!("ignoring unknown command {other:?}"),
            }
        }
    }

    fn send_move(&mut self, mv: Move) -> KalahaResult<()> {
        writeln!(self.output, "move {mv}")?;
        self.output.flush()?;
        Ok(())
    }
}

fn run() -> KalahaResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::load(Path::new(&path))?,
        None => AgentConfig::default(),
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut transport = StdioTransport {
        input: stdin.lock(),
        output: stdout.lock(),
    };

    let mut controller = TurnController::from_config(config);
    match controller.run(&mut transport)? {
        Some(result) => writeln!(transport.output, "result {result:?}")?,
        None => writeln!(transport.output, "result unknown")?,
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
