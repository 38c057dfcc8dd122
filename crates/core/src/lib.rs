//! `hazseg-core` -- dangerous-goods segregation and compatibility engine.
//!
//! Pure domain logic with no I/O: the item and group model, an immutable
//! versioned rule store, the pairwise compatibility evaluator, rule seeding
//! from declarative matrices, and a batch planner for whole shipments.

pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod hazard;
pub mod item;
pub mod planner;
pub mod profile;
pub mod rules;
pub mod seeder;
pub mod store;
pub mod types;
