//! Tic-tac-toe rules.

use std::fmt;

use crate::core::{ActionId, PlayerId, PlayerMap};
use crate::env::{Game, Turn};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Number of cells, and so of distinct actions.
pub const NUM_CELLS: usize = 9;

/// Contents of a board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    /// Player 0's mark.
    Cross,
    /// Player 1's mark.
    Nought,
}

impl Cell {
    fn of(player: PlayerId) -> Self {
        if player.index() == 0 {
            Cell::Cross
        } else {
            Cell::Nought
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Cross => 'x',
            Cell::Nought => 'o',
        }
    }
}

/// Result of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

/// Board position and side to move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicTacToeState {
    board: [Cell; NUM_CELLS],
    to_move: PlayerId,
    outcome: Option<Outcome>,
}

impl TicTacToeState {
    /// The empty board, cross to move.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            board: [Cell::Empty; NUM_CELLS],
            to_move: PlayerId::new(0),
            outcome: None,
        }
    }

    /// Contents of cell `index` (row-major).
    #[must_use]
    pub fn cell(&self, index: usize) -> Cell {
        self.board[index]
    }

    /// Result, once the game is over.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn place(&mut self, cell: usize) {
        let mark = Cell::of(self.to_move);
        self.board[cell] = mark;

        let won = LINES
            .iter()
            .any(|line| line.iter().all(|&c| self.board[c] == mark));
        if won {
            self.outcome = Some(Outcome::Winner(self.to_move));
        } else if self.board.iter().all(|&c| c != Cell::Empty) {
            self.outcome = Some(Outcome::Draw);
        }
        self.to_move = self.to_move.next(2);
    }
}

impl fmt::Display for TicTacToeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            let line: String = (0..3).map(|col| self.board[row * 3 + col].symbol()).collect();
            if row < 2 {
                writeln!(f, "{}", line)?;
            } else {
                write!(f, "{}", line)?;
            }
        }
        Ok(())
    }
}

/// Two-player noughts and crosses.
///
/// Returns are +1 for the winner, -1 for the loser and 0 for both on a draw.
/// The observation tensor has three 9-cell planes: empty, cross, nought.
#[derive(Clone, Debug, Default)]
pub struct TicTacToe;

impl TicTacToe {
    pub fn new() -> Self {
        Self
    }
}

impl Game for TicTacToe {
    type State = TicTacToeState;

    fn name(&self) -> &str {
        "tic_tac_toe"
    }

    fn player_count(&self) -> usize {
        2
    }

    fn num_distinct_actions(&self) -> usize {
        NUM_CELLS
    }

    fn observation_size(&self) -> usize {
        3 * NUM_CELLS
    }

    fn new_initial_state(&self) -> TicTacToeState {
        TicTacToeState::initial()
    }

    fn turn(&self, state: &TicTacToeState) -> Turn {
        if state.outcome.is_some() {
            Turn::Terminal
        } else {
            Turn::Player(state.to_move)
        }
    }

    fn legal_actions(&self, state: &TicTacToeState) -> Vec<ActionId> {
        if state.outcome.is_some() {
            return Vec::new();
        }
        (0..NUM_CELLS)
            .filter(|&c| state.board[c] == Cell::Empty)
            .map(|c| c as ActionId)
            .collect()
    }

    fn apply_action(&self, state: &mut TicTacToeState, action: ActionId) {
        let cell = action as usize;
        debug_assert!(state.board[cell] == Cell::Empty, "cell {} is occupied", cell);
        state.place(cell);
    }

    fn returns(&self, state: &TicTacToeState) -> PlayerMap<f64> {
        match state.outcome {
            Some(Outcome::Winner(w)) => PlayerMap::new(2, |p| if p == w { 1.0 } else { -1.0 }),
            Some(Outcome::Draw) | None => PlayerMap::with_value(2, 0.0),
        }
    }

    fn observation_tensor(&self, state: &TicTacToeState, _player: PlayerId) -> Vec<f32> {
        let mut tensor = vec![0.0; 3 * NUM_CELLS];
        for (i, cell) in state.board.iter().enumerate() {
            let plane = match cell {
                Cell::Empty => 0,
                Cell::Cross => 1,
                Cell::Nought => 2,
            };
            tensor[plane * NUM_CELLS + i] = 1.0;
        }
        tensor
    }

    fn action_to_string(&self, player: PlayerId, action: ActionId) -> String {
        let cell = action as usize;
        format!("{}({},{})", Cell::of(player).symbol(), cell / 3, cell % 3)
    }
}
