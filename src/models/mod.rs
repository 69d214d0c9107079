//! Data models for the career and activity collections.
//!
//! These models match the JSON documents consumed by the public website.

mod activity;
mod career;
mod defaults;
mod lenient;
mod record;

pub use activity::*;
pub use career::*;
pub use defaults::*;
pub use record::*;
