//! Built-in games.

pub mod tic_tac_toe;
