//! Tic-tac-toe, the shipped game for the training drivers.
//!
//! - Two seats: cross (player 0) moves first, nought (player 1) second
//! - Action `c` marks cell `c` of the 3x3 board, row-major
//! - Three in a row wins; a full board without a line is a draw

mod game;

pub use game::{Cell, Outcome, TicTacToe, TicTacToeState, NUM_CELLS};
