//! Database models for goals.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use goalcoach_core::goals::{Goal, Milestone, ProgressEvent};
use goalcoach_core::Result;

use crate::utils::{from_db_timestamp, from_db_timestamp_opt};

/// Database model for goals
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct GoalDB {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub details: Option<String>,
    pub status: String,
    pub current_progress: i32,
    pub target_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` columns are left untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::goals)]
pub struct GoalChangesDB {
    pub title: Option<String>,
    pub details: Option<String>,
    pub status: Option<String>,
    pub current_progress: Option<i32>,
    pub target_date: Option<String>,
    pub updated_at: String,
}

#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::progress_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProgressEventDB {
    pub id: String,
    pub goal_id: String,
    pub value: i32,
    pub note: Option<String>,
    pub created_at: String,
}

#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::goal_milestones)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MilestoneDB {
    pub id: String,
    pub goal_id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: String,
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::goal_milestones)]
pub struct MilestoneChangesDB {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::goal_tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalTagDB {
    pub id: String,
    pub goal_id: String,
    pub name: String,
    pub created_at: String,
}

impl TryFrom<ProgressEventDB> for ProgressEvent {
    type Error = goalcoach_core::Error;

    fn try_from(db: ProgressEventDB) -> Result<Self> {
        Ok(Self {
            created_at: from_db_timestamp(&db.created_at)?,
            id: db.id,
            goal_id: db.goal_id,
            value: db.value,
            note: db.note,
        })
    }
}

impl TryFrom<MilestoneDB> for Milestone {
    type Error = goalcoach_core::Error;

    fn try_from(db: MilestoneDB) -> Result<Self> {
        Ok(Self {
            created_at: from_db_timestamp(&db.created_at)?,
            id: db.id,
            goal_id: db.goal_id,
            title: db.title,
            completed: db.completed,
        })
    }
}

impl GoalDB {
    /// Hydrates the row with its already-loaded relations.
    pub fn into_goal(
        self,
        progress_events: Vec<ProgressEvent>,
        milestones: Vec<Milestone>,
        tags: Vec<String>,
    ) -> Result<Goal> {
        Ok(Goal {
            status: self.status.parse()?,
            target_date: from_db_timestamp_opt(self.target_date.as_deref())?,
            created_at: from_db_timestamp(&self.created_at)?,
            updated_at: from_db_timestamp(&self.updated_at)?,
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            details: self.details,
            current_progress: self.current_progress,
            progress_events,
            milestones,
            tags,
        })
    }
}
