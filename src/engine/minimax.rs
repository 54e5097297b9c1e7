use super::eval::Evaluate;
use super::{Deadline, RootSearch, SearchTimeout};
use crate::board::{Board, Move, Player};

/// Depth-limited minimax without pruning. Leaves and move-starved nodes are
/// scored by the strategy from the root player's point of view. Equal scores
/// keep the move seen first in enumeration order. An empty root yields the
/// sentinel without consulting the strategy.
pub fn search_root(
    board: &Board,
    depth: u32,
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<RootSearch, SearchTimeout> {
    deadline.check()?;
    let perspective = board.to_move();
    let mut best_move: Move = None;
    let mut best_value = f64::NEG_INFINITY;
    for mv in board.legal_moves() {
        let child = board.apply_move(mv);
        let value = min_value(&child, depth.saturating_sub(1), perspective, eval, deadline)?;
        // the first candidate always lands, so a root with moves never
        // reports the sentinel even when every line is lost
        if best_move.is_none() || value > best_value {
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
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<f64, SearchTimeout> {
    deadline.check()?;
    let moves = board.legal_moves();
    if depth == 0 || moves.is_empty() {
        return Ok(eval.evaluate(board, perspective));
    }
    let mut best = f64::NEG_INFINITY;
    for mv in moves {
        let value = min_value(&board.apply_move(mv), depth - 1, perspective, eval, deadline)?;
        best = best.max(value);
    }
    Ok(best)
}

fn min_value(
    board: &Board,
    depth: u32,
    perspective: Player,
    eval: &dyn Evaluate,
    deadline: &Deadline,
) -> Result<f64, SearchTimeout> {
    deadline.check()?;
    let moves = board.legal_moves();
    if depth == 0 || moves.is_empty() {
        return Ok(eval.evaluate(board, perspective));
    }
    let mut best = f64::INFINITY;
    for mv in moves {
        let value = max_value(&board.apply_move(mv), depth - 1, perspective, eval, deadline)?;
        best = best.min(value);
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::eval::OpenRatio;
    use super::super::test_support::CountingEval;
    use super::super::{Deadline, SearchTimeout};
    use super::search_root;
    use crate::board::fixtures::{position, shrink_to};
    use crate::board::{Player, Position};

    fn generous() -> Deadline {
        Deadline::new(Duration::from_secs(30), Duration::from_millis(10))
    }

    #[test]
    fn sole_legal_move_wins_at_any_depth() {
        let mut blocked = shrink_to(3);
        blocked.push((2, 1));
        let board = position(&blocked, Some((0, 0)), Some((2, 2)), Player::One);

        for depth in [1, 2, 5] {
            let root = search_root(&board, depth, &OpenRatio, &generous()).unwrap();
            assert_eq!(root.best_move, Some(Position::new(1, 2)));
        }
    }

    #[test]
    fn empty_root_skips_evaluation() {
        let mut blocked = shrink_to(3);
        blocked.extend([(1, 2), (2, 1)]);
        let board = position(&blocked, Some((0, 0)), Some((2, 2)), Player::One);

        let eval = CountingEval::new(OpenRatio);
        let root = search_root(&board, 3, &eval, &generous()).unwrap();
        assert_eq!(root.best_move, None);
        assert_eq!(eval.calls.get(), 0);
    }

    #[test]
    fn expired_deadline_aborts_before_any_expansion() {
        let board = position(&[], Some((3, 3)), Some((0, 0)), Player::One);
        let deadline = Deadline::new(Duration::ZERO, Duration::from_millis(10));

        let eval = CountingEval::new(OpenRatio);
        assert_eq!(search_root(&board, 3, &eval, &deadline), Err(SearchTimeout));
        assert_eq!(eval.calls.get(), 0);
    }

    #[test]
    fn avoids_the_losing_branch_at_depth_two() {
        // moving to (2, 1) self-traps one ply later; (1, 2) stays open
        let mut blocked = shrink_to(3);
        blocked.extend([(1, 1), (2, 2)]);
        let board = position(&blocked, Some((0, 0)), Some((0, 2)), Player::One);

        let root = search_root(&board, 2, &OpenRatio, &generous()).unwrap();
        assert_eq!(root.best_move, Some(Position::new(1, 2)));
        assert_eq!(root.value, 1.0 / 3.0);
    }

    #[test]
    fn hopeless_root_still_reports_a_legal_move() {
        // every line is lost; the first enumerated move is still returned
        let mut blocked = shrink_to(3);
        blocked.extend([(1, 1), (2, 2)]);
        let board = position(&blocked, Some((0, 0)), Some((0, 2)), Player::Two);

        let root = search_root(&board, 4, &OpenRatio, &generous()).unwrap();
        assert!(root.best_move.is_some());
        assert_eq!(root.value, f64::NEG_INFINITY);
    }
}
