//! SQLite storage implementation for goals.

mod model;
mod repository;

pub use model::{GoalDB, GoalTagDB, MilestoneDB, ProgressEventDB};
pub use repository::GoalRepository;
pub(crate) use repository::{apply_goal_update, insert_goal_row};
