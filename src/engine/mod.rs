pub mod alphabeta;
pub mod eval;
pub mod minimax;

use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::board::{Board, Move};
use eval::Evaluate;

/// Raised by the deadline guard when the remaining budget dips below the
/// safety margin. Propagates through every active recursion frame; the
/// iterative-deepening driver is the only place allowed to absorb it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("move deadline exhausted before the search completed")]
pub struct SearchTimeout;

/// Absolute expiry for one top-level search, shared read-only by every
/// frame of that search's call tree.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Instant,
    margin: Duration,
}

impl Deadline {
    pub fn new(budget: Duration, margin: Duration) -> Self {
        Self {
            expires: Instant::now() + budget,
            margin,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.expires.saturating_duration_since(Instant::now())
    }

    // every recursive entry point runs this before touching the board; a
    // deep branch can blow the budget on its own, so the root check alone
    // is not enough
    pub fn check(&self) -> Result<(), SearchTimeout> {
        if self.remaining() < self.margin {
            Err(SearchTimeout)
        } else {
            Ok(())
        }
    }
}

/// A completed root search: the chosen move and the score that justified it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSearch {
    pub best_move: Move,
    pub value: f64,
}

pub const TIMER_MARGIN: Duration = Duration::from_millis(10);

pub struct Engine {
    heuristic: Box<dyn Evaluate + Send + Sync>,
    margin: Duration,
}

impl Engine {
    pub fn new(heuristic: Box<dyn Evaluate + Send + Sync>) -> Self {
        Self::with_margin(heuristic, TIMER_MARGIN)
    }

    pub fn with_margin(heuristic: Box<dyn Evaluate + Send + Sync>, margin: Duration) -> Self {
        Self { heuristic, margin }
    }

    /// Iterative deepening alpha-beta under a wall-clock budget. Each depth
    /// runs to completion or not at all; a timed-out depth is discarded and
    /// the previous depth's answer stands. Returns `None` when the position
    /// has no legal moves, or when even the first iteration had no time.
    pub fn best_move(&self, board: &Board, budget: Duration) -> Move {
        let deadline = Deadline::new(budget, self.margin);
        let mut best: Move = None;
        let mut depth = 1;
        loop {
            match alphabeta::search_root(board, depth, self.heuristic.as_ref(), &deadline) {
                Ok(root) => {
                    best = root.best_move;
                    debug!("depth {depth}: best {:?} valued {}", root.best_move, root.value);
                    // a decisive score cannot change with more depth, and an
                    // empty root has nothing left to search
                    if root.value.is_infinite() || root.best_move.is_none() {
                        break;
                    }
                    depth += 1;
                }
                Err(SearchTimeout) => {
                    debug!("depth {depth} timed out, keeping the depth {} answer", depth - 1);
                    break;
                }
            }
        }
        best
    }

    /// Fixed-depth minimax under the same budget. The search itself signals
    /// a timeout; this boundary converts it into the fallback sentinel.
    pub fn minimax_move(&self, board: &Board, depth: u32, budget: Duration) -> Move {
        let deadline = Deadline::new(budget, self.margin);
        match minimax::search_root(board, depth, self.heuristic.as_ref(), &deadline) {
            Ok(root) => root.best_move,
            Err(SearchTimeout) => None,
        }
    }
}
