use crate::errors::Result;
use crate::goals::goals_model::{
    Goal, GoalUpdate, Milestone, MilestoneUpdate, NewGoal, NewMilestone, NewProgressEvent,
};
use async_trait::async_trait;

/// Trait for goal repository operations.
///
/// Every call is scoped to the owning user; a goal belonging to someone else
/// behaves exactly like a missing goal.
#[async_trait]
pub trait GoalRepositoryTrait: Send + Sync {
    fn load_goals(&self, user_id: &str) -> Result<Vec<Goal>>;
    /// Goal snapshot for the coach: newest progress events only.
    fn load_goals_for_coach(&self, user_id: &str) -> Result<Vec<Goal>>;
    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>>;
    async fn insert_goal(&self, user_id: &str, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, user_id: &str, goal_id: &str, update: GoalUpdate) -> Result<Goal>;
    async fn add_progress_event(
        &self,
        user_id: &str,
        goal_id: &str,
        event: NewProgressEvent,
    ) -> Result<Goal>;
    async fn add_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone: NewMilestone,
    ) -> Result<Milestone>;
    async fn update_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> Result<Milestone>;
    async fn add_tag(&self, user_id: &str, goal_id: &str, name: &str) -> Result<Goal>;
}

/// Trait for goal service operations
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    fn get_goals(&self, user_id: &str) -> Result<Vec<Goal>>;
    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Goal>;
    async fn create_goal(&self, user_id: &str, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, user_id: &str, goal_id: &str, update: GoalUpdate) -> Result<Goal>;
    async fn log_progress(
        &self,
        user_id: &str,
        goal_id: &str,
        event: NewProgressEvent,
    ) -> Result<Goal>;
    async fn add_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone: NewMilestone,
    ) -> Result<Milestone>;
    async fn update_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> Result<Milestone>;
    async fn add_tag(&self, user_id: &str, goal_id: &str, name: &str) -> Result<Goal>;
}
