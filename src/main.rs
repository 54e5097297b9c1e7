mod board;
mod engine;

use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use clap::Parser;
use log::{info, error};
use tokio::net::{TcpListener, TcpStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::protocol::Message;
use crate::board::{Board, Move, Player, Position};
use crate::engine::eval::HeuristicKind;
use crate::engine::Engine;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 999)]
    port: u16,
    /// wall-clock budget per engine move, in milliseconds
    #[arg(long, default_value_t = 150)]
    time_budget_ms: u64,
    /// time the deadline guard keeps in reserve, in milliseconds
    #[arg(long, default_value_t = 10)]
    margin_ms: u64,
    #[arg(long, value_enum, default_value = "open-ratio")]
    heuristic: HeuristicKind,
    /// fixed minimax depth; 0 selects iterative deepening alpha-beta
    #[arg(long, default_value_t = 0)]
    minimax_depth: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    // Bind the server to a local port
    let listener = TcpListener::bind(address.clone()).await.expect("Failed to bind");
    info!("Listening on: {}", address);

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(accept_connection(stream, args.clone()));
    }

    Ok(())
}

struct Game {
    started: bool,
    engine_player: Player,
    board: Board,
    engine: Engine,
    budget: Duration,
    minimax_depth: u32,
}

impl Game {
    fn new(args: &Args) -> Self {
        Self {
            started: false,
            engine_player: Player::Two,
            board: Board::new(),
            engine: Engine::with_margin(
                args.heuristic.strategy(),
                Duration::from_millis(args.margin_ms),
            ),
            budget: Duration::from_millis(args.time_budget_ms),
            minimax_depth: args.minimax_depth,
        }
    }

    fn pick_move(&self) -> Move {
        if self.minimax_depth > 0 {
            self.engine.minimax_move(&self.board, self.minimax_depth, self.budget)
        } else {
            self.engine.best_move(&self.board, self.budget)
        }
    }
}

async fn accept_connection(stream: TcpStream, args: Args) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .expect("Error during the websocket handshake occurred");
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let game_mutex = Arc::new(Mutex::new(Game::new(&args)));

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        let result: Result<Value, Error> = handle_message(&game_mutex, data).await;
                        let response = match result {
                            Ok(resp) => resp,
                            Err(e) => {
                                error!("Error handling message: {:?}", e);
                                json!({"error": format!("{:?}", e)})
                            }
                        };
                        let response_str = response.to_string();
                        write.send(Message::text(response_str.clone())).await
                                    .expect(&format!("Failed to send message: {}", response_str));
                        info!("Sent: {}", response_str);
                    },
                    Err(e) => { error!("Error parsing JSON: {:?}", e); }
                }
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    Ok(())
}

async fn handle_message(game_mutex: &Arc<Mutex<Game>>, data: Value) -> Result<Value, Error> {
    let mut game = game_mutex.lock().unwrap();

    let map = data.as_object()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "Expected a dict"))?;

    // client message protocol: "start", "move"
    // server message protocol: "move", "legal_moves", "error", "end"
    if map.contains_key("start") {
        let client_first = data["start"].as_bool().ok_or_else(
            || Error::new(ErrorKind::InvalidInput, "Expected boolean field: start")
        )?;
        let response = handle_start(&mut game, client_first)?;
        Ok(response)
    } else if map.contains_key("move") {
        if !game.started {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        let maybe_move: Option<Position> = serde_json::from_value(data["move"].clone())?;
        let response = handle_move(&mut game, maybe_move)?;
        Ok(response)
    } else {
        Err(Error::new(ErrorKind::InvalidInput, format!("Invalid message: {}", data)))
    }
}

fn handle_start(game: &mut Game, client_first: bool) -> Result<Value, Error> {
    game.started = true;
    if client_first {
        game.engine_player = Player::Two;
        Ok(json!({ "legal_moves": game.board.legal_moves() }))
    } else {
        game.engine_player = Player::One;
        make_engine_move(game)
    }
}

fn handle_move(game: &mut Game, maybe_move: Option<Position>) -> Result<Value, Error> {
    match maybe_move {
        Some(mv) => {
            game.board = game.board.try_move(mv)
                .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?;
        }
        // a null move is only valid as "I am out of moves"
        None if game.board.legal_moves().is_empty() => {}
        None => {
            return Err(Error::new(ErrorKind::InvalidInput, "Moves remain, cannot pass"));
        }
    }
    match check_game_over(game) {
        Some(game_over) => Ok(game_over),
        None => make_engine_move(game)
    }
}

fn make_engine_move(game: &mut Game) -> Result<Value, Error> {
    let selected_move = game.pick_move();
    let mv = selected_move.ok_or_else(
        || Error::new(ErrorKind::TimedOut, "Search produced no move within the budget")
    )?;
    game.board = game.board.try_move(mv)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?;
    match check_game_over(game) {
        Some(game_over) => Ok(game_over),
        None => Ok(json!({ "move": mv, "legal_moves": game.board.legal_moves() }))
    }
}

fn check_game_over(game: &Game) -> Option<Value> {
    if game.board.is_winner(game.engine_player) {
        Some(json!({ "end": true }))
    } else if game.board.is_loser(game.engine_player) {
        Some(json!({ "end": false }))
    } else {
        None
    }
}
