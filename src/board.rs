use bitvec::{prelude::*, slice::IterOnes};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const WIDTH: usize = 7;
const HEIGHT: usize = 7;
const CELLS: usize = WIDTH * HEIGHT;
pub type BitBoard = BitArr!(for CELLS, in u64, Lsb0);
// cells are indexed row-major, top-left to bottom-right

pub trait CellMask {
    fn empty() -> Self;
    fn set_cell(&mut self, pos: Position);
    fn from_cell(pos: Position) -> Self;
    type IterCells<'a>: Iterator<Item = Position> + 'a
    where
        Self: 'a;
    fn iter_cells(&'_ self) -> Self::IterCells<'_>;
}

impl CellMask for BitBoard {
    fn empty() -> Self {
        bitarr!(u64, Lsb0; 0; CELLS)
    }

    fn set_cell(&mut self, pos: Position) {
        self.set(pos.index(), true);
    }

    fn from_cell(pos: Position) -> Self {
        let mut mask = BitBoard::empty();
        mask.set_cell(pos);
        mask
    }

    type IterCells<'a> = std::iter::Map<IterOnes<'a, u64, Lsb0>, fn(usize) -> Position>;

    fn iter_cells(&'_ self) -> Self::IterCells<'_> {
        self.iter_ones().map(Position::from_index)
    }
}

// L-shaped jumps, the only movement rule once a player is on the board
const JUMP_OFFSETS: [(isize, isize); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

lazy_static! {
    static ref JUMP_MASKS: Vec<BitBoard> = {
        let mut masks = Vec::with_capacity(CELLS);
        for idx in 0..CELLS {
            let row = (idx / WIDTH) as isize;
            let col = (idx % WIDTH) as isize;
            let mut mask = BitBoard::empty();
            for (dr, dc) in JUMP_OFFSETS {
                let (r, c) = (row + dr, col + dc);
                if (0..HEIGHT as isize).contains(&r) && (0..WIDTH as isize).contains(&c) {
                    mask.set_cell(Position::new(r as usize, c as usize));
                }
            }
            masks.push(mask);
        }
        masks
    };
    // the storage word has bits past the last cell; mask them out of complements
    static ref CELL_MASK: BitBoard = {
        let mut mask = BitBoard::empty();
        for idx in 0..CELLS {
            mask.set(idx, true);
        }
        mask
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    fn index(self) -> usize {
        self.row * WIDTH + self.col
    }

    fn from_index(idx: usize) -> Self {
        Self {
            row: idx / WIDTH,
            col: idx % WIDTH,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A chosen action: a board cell, or `None` when the mover has no legal move.
pub type Move = Option<Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("illegal move to {0}")]
    IllegalMove(Position),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Board {
    blocked: BitBoard, // every cell either player has ever occupied
    positions: [Option<Position>; 2],
    to_move: Player,
}

impl Board {
    pub fn new() -> Self {
        Self {
            blocked: BitBoard::empty(),
            positions: [None; 2],
            to_move: Player::One,
        }
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn position_of(&self, player: Player) -> Option<Position> {
        self.positions[player.index()]
    }

    fn blank_mask(&self) -> BitBoard {
        !self.blocked & *CELL_MASK
    }

    pub fn blank_count(&self) -> usize {
        CELLS - self.blocked.count_ones()
    }

    pub fn legal_moves(&self) -> Vec<Position> {
        self.legal_moves_for(self.to_move)
    }

    // before the first placement any blank cell is reachable; afterwards
    // only blank jump targets are
    pub fn legal_moves_for(&self, player: Player) -> Vec<Position> {
        let blanks = self.blank_mask();
        let targets = match self.positions[player.index()] {
            Some(pos) => JUMP_MASKS[pos.index()] & blanks,
            None => blanks,
        };
        targets.iter_cells().collect()
    }

    pub fn is_loser(&self, player: Player) -> bool {
        self.to_move == player && self.legal_moves_for(player).is_empty()
    }

    pub fn is_winner(&self, player: Player) -> bool {
        self.is_loser(player.opponent())
    }

    // definitive win/loss score of a finished position, zero while undecided
    pub fn utility(&self, player: Player) -> f64 {
        if self.is_winner(player) {
            f64::INFINITY
        } else if self.is_loser(player) {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    }

    /// Applies a move produced by `legal_moves`, yielding the successor
    /// position. The parent board is left untouched.
    pub fn apply_move(&self, mv: Position) -> Board {
        debug_assert!(
            self.legal_moves().contains(&mv),
            "apply_move expects a generated legal move, got {mv}"
        );
        let mut board = self.clone();
        board.blocked |= BitBoard::from_cell(mv);
        board.positions[self.to_move.index()] = Some(mv);
        board.to_move = self.to_move.opponent();
        board
    }

    /// Validated variant of `apply_move` for untrusted input.
    pub fn try_move(&self, mv: Position) -> Result<Board, BoardError> {
        if !self.legal_moves().contains(&mv) {
            return Err(BoardError::IllegalMove(mv));
        }
        Ok(self.apply_move(mv))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{position, shrink_to};
    use super::*;

    #[test]
    fn opening_moves_cover_every_blank_cell() {
        let board = Board::new();
        assert_eq!(board.legal_moves().len(), CELLS);

        let board = board.apply_move(Position::new(3, 3));
        assert_eq!(board.to_move(), Player::Two);
        assert_eq!(board.legal_moves().len(), CELLS - 1);
        assert_eq!(board.blank_count(), CELLS - 1);
    }

    #[test]
    fn placed_player_moves_by_jumps_only() {
        let board = position(&[], Some((3, 3)), Some((0, 0)), Player::One);
        let moves = board.legal_moves();
        assert_eq!(moves.len(), 8);
        assert!(moves.contains(&Position::new(1, 2)));
        assert!(moves.contains(&Position::new(5, 4)));

        let board = position(&[], Some((0, 0)), Some((3, 3)), Player::One);
        let mut moves = board.legal_moves();
        moves.sort_by_key(|pos| (pos.row, pos.col));
        assert_eq!(moves, vec![Position::new(1, 2), Position::new(2, 1)]);
    }

    #[test]
    fn move_enumeration_order_is_ascending_cell_index() {
        let board = position(&[], Some((3, 3)), Some((0, 0)), Player::One);
        let moves = board.legal_moves();
        let mut sorted = moves.clone();
        sorted.sort_by_key(|pos| (pos.row, pos.col));
        assert_eq!(moves, sorted);
    }

    #[test]
    fn origin_cell_never_becomes_legal_again() {
        let board = position(&[], Some((2, 2)), Some((5, 5)), Player::One);
        let origin = Position::new(2, 2);
        let board = board.apply_move(Position::new(4, 3));
        let board = board.apply_move(Position::new(3, 4));
        // mover is back on the clock; its own trail stays blocked
        assert!(!board.legal_moves().contains(&origin));
        assert!(!board.legal_moves_for(Player::Two).contains(&origin));
    }

    #[test]
    fn try_move_rejects_off_pattern_and_occupied_targets() {
        let board = position(&[], Some((3, 3)), Some((1, 2)), Player::One);
        assert_eq!(
            board.try_move(Position::new(3, 4)),
            Err(BoardError::IllegalMove(Position::new(3, 4)))
        );
        assert_eq!(
            board.try_move(Position::new(1, 2)),
            Err(BoardError::IllegalMove(Position::new(1, 2)))
        );
        assert!(board.try_move(Position::new(5, 4)).is_ok());
    }

    #[test]
    fn trapped_active_player_loses() {
        let mut blocked = shrink_to(3);
        blocked.extend([(1, 2), (2, 1)]);
        let board = position(&blocked, Some((0, 0)), Some((2, 2)), Player::One);

        assert!(board.legal_moves().is_empty());
        assert!(board.is_loser(Player::One));
        assert!(board.is_winner(Player::Two));
        assert_eq!(board.utility(Player::One), f64::NEG_INFINITY);
        assert_eq!(board.utility(Player::Two), f64::INFINITY);
    }

    #[test]
    fn undecided_position_has_zero_utility() {
        let board = position(&[], Some((3, 3)), Some((0, 0)), Player::One);
        assert_eq!(board.utility(Player::One), 0.0);
        assert_eq!(board.utility(Player::Two), 0.0);
    }

    #[test]
    fn position_wire_format_round_trips() {
        let pos = Position::new(4, 6);
        let encoded = serde_json::to_value(pos).unwrap();
        assert_eq!(encoded, serde_json::json!({ "row": 4, "col": 6 }));
        let decoded: Position = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, pos);
    }
}
