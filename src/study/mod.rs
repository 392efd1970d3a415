//! Spaced repetition study mode
//!
//! This module provides:
//! - Study cards, one per article added to study
//! - Difficulty-tiered exponential review intervals
//! - Session log and daily streaks
//! - Daily, weekly and monthly review goals
//! - JSON persistence in the data directory

pub mod algorithm;
pub mod goals;
pub mod models;
pub mod storage;
pub mod store;

pub use models::*;
pub use storage::{StudyError, StudyStorage};
pub use store::StudyStore;
