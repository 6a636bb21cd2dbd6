pub mod engine;
pub mod factors;

pub use engine::{label_for, ScoringEngine};
