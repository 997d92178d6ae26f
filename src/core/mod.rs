//! Core types: seats, per-seat storage, RNG and time steps.
//!
//! These are shared by environments, agents and the training loops.

pub mod player;
pub mod rng;
pub mod time_step;

pub use player::{PlayerId, PlayerMap};
pub use rng::GameRng;
pub use time_step::{ActionId, Observations, StepType, TimeStep};
