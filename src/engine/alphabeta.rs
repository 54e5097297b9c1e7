use super::eval::Evaluate;
use super::{Deadline, RootSearch, SearchTimeout};
use crate::board::{Board, Move, Player};

/// Depth-limited search with alpha-beta pruning. Move-starved nodes score as
/// the game's terminal utility; depth-exhausted nodes with moves left score
/// by the strategy. Pruning never changes the root value, only the nodes
/// visited. Equal root scores keep the move seen last in enumeration order
/// (the `>=` comparison below), the opposite of the minimax tie-break.
pub fn search_root(
    board: &Board,
    depth: u32,
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<RootSearch, SearchTimeout> {
    deadline.check()?;
    let perspective = board.to_move();
    let beta = f64::INFINITY;
    let mut alpha = f64::NEG_INFINITY;
    let mut best_move: Move = None;
    let mut best_value = f64::NEG_INFINITY;
    for mv in board.legal_moves() {
        let child = board.apply_move(mv);
        let value = min_value(
            &child,
            depth.saturating_sub(1),
            perspective,
            alpha,
            beta,
            eval,
            deadline,
        )?;
        alpha = alpha.max(value);
        if value >= best_value {
            best_value = value;
            best_move = Some(mv);
        }
    }
    Ok(RootSearch {
        best_move,
        value: best_value,
    })
}

fn max_value(
    board: &Board,
    depth: u32,
    perspective: Player,
    mut alpha: f64,
    beta: f64,
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<f64, SearchTimeout> {
    deadline.check()?;
    let moves = board.legal_moves();
    if moves.is_empty() {
        return Ok(board.utility(perspective));
    }
    if depth == 0 {
        return Ok(eval.evaluate(board, perspective));
    }
    let mut best = f64::NEG_INFINITY;
    for mv in moves {
        let value = min_value(
            &board.apply_move(mv),
            depth - 1,
            perspective,
            alpha,
            beta,
            eval,
            deadline,
        )?;
        best = best.max(value);
        if best >= beta {
            return Ok(best);
        }
        alpha = alpha.max(best);
    }
    Ok(best)
}

fn min_value(
    board: &Board,
    depth: u32,
    perspective: Player,
    alpha: f64,
    mut beta: f64,
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<f64, SearchTimeout> {
    deadline.check()?;
    let moves = board.legal_moves();
    if moves.is_empty() {
        return Ok(board.utility(perspective));
    }
    if depth == 0 {
        return Ok(eval.evaluate(board, perspective));
    }
    let mut best = f64::INFINITY;
    for mv in moves {
        let value = max_value(
            &board.apply_move(mv),
            depth - 1,
            perspective,
            alpha,
            beta,
            eval,
            deadline,
        )?;
        best = best.min(value);
        if best <= alpha {
            return Ok(best);
        }
        beta = beta.min(best);
    }
    Ok(best)
}
