use log::debug;
use std::sync::Arc;

use super::goals_model::{
    Goal, GoalUpdate, Milestone, MilestoneUpdate, NewGoal, NewMilestone, NewProgressEvent,
};
use super::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::coach::CoachError;
use crate::errors::{Error, Result};

/// Service for managing goals
pub struct GoalService {
    repository: Arc<dyn GoalRepositoryTrait>,
}

impl GoalService {
    pub fn new(repository: Arc<dyn GoalRepositoryTrait>) -> Self {
        Self { repository }
    }
}

fn goal_not_found() -> Error {
    CoachError::NotFound("Goal not found".to_string()).into()
}

#[async_trait::async_trait]
impl GoalServiceTrait for GoalService {
    fn get_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.repository.load_goals(user_id)
    }

    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Goal> {
        self.repository
            .get_goal(user_id, goal_id)?
            .ok_or_else(goal_not_found)
    }

    async fn create_goal(&self, user_id: &str, new_goal: NewGoal) -> Result<Goal> {
        new_goal.validate()?;
        debug!("Creating goal for user {}", user_id);
        let new_goal = NewGoal {
            title: new_goal.title.trim().to_string(),
            ..new_goal
        };
        self.repository.insert_goal(user_id, new_goal).await
    }

    async fn update_goal(&self, user_id: &str, goal_id: &str, update: GoalUpdate) -> Result<Goal> {
        update.validate()?;
        if update.is_empty() {
            return self.get_goal(user_id, goal_id);
        }
        self.repository.update_goal(user_id, goal_id, update).await
    }

    async fn log_progress(
        &self,
        user_id: &str,
        goal_id: &str,
        event: NewProgressEvent,
    ) -> Result<Goal> {
        event.validate()?;
        self.repository
            .add_progress_event(user_id, goal_id, event)
            .await
    }

    async fn add_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone: NewMilestone,
    ) -> Result<Milestone> {
        let title = milestone.title.trim();
        if title.is_empty() || title.chars().count() > 120 {
            return Err(Error::invalid_input(
                "Milestone title must be 1 to 120 characters",
            ));
        }
        self.repository
            .add_milestone(
                user_id,
                goal_id,
                NewMilestone {
                    title: title.to_string(),
                },
            )
            .await
    }

    async fn update_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> Result<Milestone> {
        if let Some(title) = &update.title {
            let len = title.trim().chars().count();
            if len == 0 || len > 120 {
                return Err(Error::invalid_input(
                    "Milestone title must be 1 to 120 characters",
                ));
            }
        }
        self.repository
            .update_milestone(user_id, goal_id, milestone_id, update)
            .await
    }

    async fn add_tag(&self, user_id: &str, goal_id: &str, name: &str) -> Result<Goal> {
        let name = name.trim().to_lowercase();
        if name.is_empty() || name.chars().count() > 40 {
            return Err(Error::invalid_input("Tag must be 1 to 40 characters"));
        }
        self.repository.add_tag(user_id, goal_id, &name).await
    }
}
