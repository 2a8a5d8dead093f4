//! Goals domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Lifecycle status of a goal as stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Completed => "COMPLETED",
            GoalStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(GoalStatus::Active),
            "COMPLETED" => Ok(GoalStatus::Completed),
            "ARCHIVED" => Ok(GoalStatus::Archived),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown goal status: {}",
                other
            )))),
        }
    }
}

/// A progress log entry. Goals carry these newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub id: String,
    pub goal_id: String,
    pub value: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub goal_id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Domain model representing a goal hydrated with its relations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub details: Option<String>,
    pub status: GoalStatus,
    pub current_progress: i32,
    pub target_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub progress_events: Vec<ProgressEvent>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Goal {
    /// Status used by the coach: archived stays archived, 100% progress counts
    /// as completed regardless of the stored status, everything else is active.
    pub fn effective_status(&self) -> GoalStatus {
        if self.status == GoalStatus::Archived {
            return GoalStatus::Archived;
        }
        if self.current_progress >= 100 {
            GoalStatus::Completed
        } else {
            GoalStatus::Active
        }
    }

    pub fn next_open_milestone(&self) -> Option<&Milestone> {
        self.milestones.iter().find(|m| !m.completed)
    }
}

/// Input model for creating a new goal
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub title: String,
    pub details: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
}

impl NewGoal {
    pub fn validate(&self) -> Result<(), Error> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "title".to_string(),
            )));
        }
        if title.chars().count() > 120 {
            return Err(Error::invalid_input("Title must be at most 120 characters"));
        }
        if let Some(details) = &self.details {
            if details.chars().count() > 2000 {
                return Err(Error::invalid_input(
                    "Details must be at most 2000 characters",
                ));
            }
        }
        Ok(())
    }
}

/// Partial update of a goal. `None` leaves the field untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub details: Option<String>,
    pub status: Option<GoalStatus>,
    pub target_date: Option<DateTime<Utc>>,
    pub current_progress: Option<i32>,
}

impl GoalUpdate {
    pub fn is_empty(&self) -> bool {
        self == &GoalUpdate::default()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if let Some(title) = &self.title {
            let len = title.trim().chars().count();
            if len == 0 || len > 120 {
                return Err(Error::invalid_input("Title must be 1 to 120 characters"));
            }
        }
        if let Some(details) = &self.details {
            if details.chars().count() > 2000 {
                return Err(Error::invalid_input(
                    "Details must be at most 2000 characters",
                ));
            }
        }
        if let Some(progress) = self.current_progress {
            if !(0..=100).contains(&progress) {
                return Err(Error::invalid_input("Progress must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewProgressEvent {
    pub value: i32,
    pub note: Option<String>,
}

impl NewProgressEvent {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0..=100).contains(&self.value) {
            return Err(Error::invalid_input("Progress must be between 0 and 100"));
        }
        if self.note.as_deref().map(|n| n.chars().count() > 500) == Some(true) {
            return Err(Error::invalid_input("Note must be at most 500 characters"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewMilestone {
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub completed: Option<bool>,
}
