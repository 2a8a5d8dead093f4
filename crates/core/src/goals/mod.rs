//! Goals module - domain models, services, and traits.

mod goals_model;
mod goals_service;
mod goals_traits;


pub use goals_model::{
    Goal, GoalStatus, GoalUpdate, Milestone, MilestoneUpdate, NewGoal, NewMilestone,
    NewProgressEvent, ProgressEvent,
};
pub use goals_service::GoalService;
pub use goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
