//! Environments: the `Game` rules contract, single environments and batches.

pub mod environment;
pub mod game;
pub mod vector;

pub use environment::Environment;
pub use game::{Game, Turn};
pub use vector::{SyncVectorEnv, VectorStep};
