use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use goalcoach_core::coach::CoachError;
use goalcoach_core::constants::COACH_PROGRESS_EVENTS_LIMIT;
use goalcoach_core::goals::{
    Goal, GoalRepositoryTrait, GoalStatus, GoalUpdate, Milestone, MilestoneUpdate, NewGoal,
    NewMilestone, NewProgressEvent, ProgressEvent,
};
use goalcoach_core::{Error, Result};

use super::model::{
    GoalChangesDB, GoalDB, GoalTagDB, MilestoneChangesDB, MilestoneDB, ProgressEventDB,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{goal_milestones, goal_tags, goals, progress_events};
use crate::utils::to_db_timestamp;

fn goal_not_found() -> Error {
    CoachError::NotFound("Goal not found".to_string()).into()
}

/// Loads relations for `rows` and builds domain goals in the same order.
/// `events_limit` caps progress events per goal (newest kept).
fn hydrate_goals(
    conn: &mut SqliteConnection,
    rows: Vec<GoalDB>,
    events_limit: Option<usize>,
) -> Result<Vec<Goal>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|g| g.id.clone()).collect();

    let mut events: HashMap<String, Vec<ProgressEvent>> = HashMap::new();
    for row in progress_events::table
        .filter(progress_events::goal_id.eq_any(&ids))
        .order((progress_events::created_at.desc(), progress_events::id.desc()))
        .select(ProgressEventDB::as_select())
        .load::<ProgressEventDB>(conn)
        .into_core()?
    {
        let bucket = events.entry(row.goal_id.clone()).or_default();
        if events_limit.map_or(true, |limit| bucket.len() < limit) {
            bucket.push(ProgressEvent::try_from(row)?);
        }
    }

    let mut milestones: HashMap<String, Vec<Milestone>> = HashMap::new();
    for row in goal_milestones::table
        .filter(goal_milestones::goal_id.eq_any(&ids))
        .order((goal_milestones::created_at.asc(), goal_milestones::id.asc()))
        .select(MilestoneDB::as_select())
        .load::<MilestoneDB>(conn)
        .into_core()?
    {
        milestones
            .entry(row.goal_id.clone())
            .or_default()
            .push(Milestone::try_from(row)?);
    }

    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    for row in goal_tags::table
        .filter(goal_tags::goal_id.eq_any(&ids))
        .order((goal_tags::created_at.asc(), goal_tags::name.asc()))
        .select(GoalTagDB::as_select())
        .load::<GoalTagDB>(conn)
        .into_core()?
    {
        tags.entry(row.goal_id).or_default().push(row.name);
    }

    rows.into_iter()
        .map(|row| {
            let id = row.id.clone();
            row.into_goal(
                events.remove(&id).unwrap_or_default(),
                milestones.remove(&id).unwrap_or_default(),
                tags.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

fn find_goal_row(
    conn: &mut SqliteConnection,
    user_id: &str,
    goal_id: &str,
) -> Result<Option<GoalDB>> {
    goals::table
        .filter(goals::id.eq(goal_id))
        .filter(goals::user_id.eq(user_id))
        .select(GoalDB::as_select())
        .first::<GoalDB>(conn)
        .optional()
        .into_core()
}

fn find_goal(
    conn: &mut SqliteConnection,
    user_id: &str,
    goal_id: &str,
) -> Result<Option<Goal>> {
    match find_goal_row(conn, user_id, goal_id)? {
        Some(row) => Ok(hydrate_goals(conn, vec![row], None)?.pop()),
        None => Ok(None),
    }
}

fn require_goal(conn: &mut SqliteConnection, user_id: &str, goal_id: &str) -> Result<Goal> {
    find_goal(conn, user_id, goal_id)?.ok_or_else(goal_not_found)
}

pub(crate) fn insert_goal_row(
    conn: &mut SqliteConnection,
    user_id: &str,
    new_goal: NewGoal,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let timestamp = to_db_timestamp(now);
    let row = GoalDB {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: new_goal.title,
        details: new_goal.details,
        status: GoalStatus::Active.as_str().to_string(),
        current_progress: 0,
        target_date: new_goal.target_date.map(to_db_timestamp),
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    let inserted = diesel::insert_into(goals::table)
        .values(&row)
        .returning(GoalDB::as_returning())
        .get_result(conn)
        .into_core()?;
    inserted.into_goal(Vec::new(), Vec::new(), Vec::new())
}

/// Writes the present fields of `update`. Missing or foreign goals are
/// reported as not found.
pub(crate) fn apply_goal_update(
    conn: &mut SqliteConnection,
    user_id: &str,
    goal_id: &str,
    update: &GoalUpdate,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let changes = GoalChangesDB {
        title: update.title.clone(),
        details: update.details.clone(),
        status: update.status.map(|s| s.as_str().to_string()),
        current_progress: update.current_progress,
        target_date: update.target_date.map(to_db_timestamp),
        updated_at: to_db_timestamp(now),
    };
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::user_id.eq(user_id)),
    )
    .set(&changes)
    .execute(conn)
    .into_core()?;
    if updated == 0 {
        return Err(goal_not_found());
    }
    require_goal(conn, user_id, goal_id)
}

pub struct GoalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl GoalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        GoalRepository { pool, writer }
    }

    fn load_goals_impl(&self, user_id: &str, events_limit: Option<usize>) -> Result<Vec<Goal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goals::table
            .filter(goals::user_id.eq(user_id))
            .order((goals::updated_at.desc(), goals::id.asc()))
            .select(GoalDB::as_select())
            .load::<GoalDB>(&mut conn)
            .into_core()?;
        hydrate_goals(&mut conn, rows, events_limit)
    }
}

#[async_trait]
impl GoalRepositoryTrait for GoalRepository {
    fn load_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.load_goals_impl(user_id, None)
    }

    fn load_goals_for_coach(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.load_goals_impl(user_id, Some(COACH_PROGRESS_EVENTS_LIMIT as usize))
    }

    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>> {
        let mut conn = get_connection(&self.pool)?;
        find_goal(&mut conn, user_id, goal_id)
    }

    async fn insert_goal(&self, user_id: &str, new_goal: NewGoal) -> Result<Goal> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                insert_goal_row(conn, &user_id, new_goal, Utc::now())
            })
            .await
    }

    async fn update_goal(&self, user_id: &str, goal_id: &str, update: GoalUpdate) -> Result<Goal> {
        let user_id = user_id.to_string();
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                apply_goal_update(conn, &user_id, &goal_id, &update, Utc::now())
            })
            .await
    }

    async fn add_progress_event(
        &self,
        user_id: &str,
        goal_id: &str,
        event: NewProgressEvent,
    ) -> Result<Goal> {
        let user_id = user_id.to_string();
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                let now = Utc::now();
                if find_goal_row(conn, &user_id, &goal_id)?.is_none() {
                    return Err(goal_not_found());
                }
                diesel::insert_into(progress_events::table)
                    .values(&ProgressEventDB {
                        id: Uuid::new_v4().to_string(),
                        goal_id: goal_id.clone(),
                        value: event.value,
                        note: event.note,
                        created_at: to_db_timestamp(now),
                    })
                    .execute(conn)
                    .into_core()?;
                let update = GoalUpdate {
                    current_progress: Some(event.value),
                    ..Default::default()
                };
                apply_goal_update(conn, &user_id, &goal_id, &update, now)
            })
            .await
    }

    async fn add_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone: NewMilestone,
    ) -> Result<Milestone> {
        let user_id = user_id.to_string();
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Milestone> {
                if find_goal_row(conn, &user_id, &goal_id)?.is_none() {
                    return Err(goal_not_found());
                }
                let row = diesel::insert_into(goal_milestones::table)
                    .values(&MilestoneDB {
                        id: Uuid::new_v4().to_string(),
                        goal_id,
                        title: milestone.title,
                        completed: false,
                        created_at: to_db_timestamp(Utc::now()),
                    })
                    .returning(MilestoneDB::as_returning())
                    .get_result(conn)
                    .into_core()?;
                Milestone::try_from(row)
            })
            .await
    }

    async fn update_milestone(
        &self,
        user_id: &str,
        goal_id: &str,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> Result<Milestone> {
        let user_id = user_id.to_string();
        let goal_id = goal_id.to_string();
        let milestone_id = milestone_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Milestone> {
                if find_goal_row(conn, &user_id, &goal_id)?.is_none() {
                    return Err(goal_not_found());
                }
                if update.title.is_some() || update.completed.is_some() {
                    diesel::update(
                        goal_milestones::table
                            .filter(goal_milestones::id.eq(&milestone_id))
                            .filter(goal_milestones::goal_id.eq(&goal_id)),
                    )
                    .set(&MilestoneChangesDB {
                        title: update.title.map(|t| t.trim().to_string()),
                        completed: update.completed,
                    })
                    .execute(conn)
                    .into_core()?;
                }
                let row = goal_milestones::table
                    .filter(goal_milestones::id.eq(&milestone_id))
                    .filter(goal_milestones::goal_id.eq(&goal_id))
                    .select(MilestoneDB::as_select())
                    .first::<MilestoneDB>(conn)
                    .optional()
                    .into_core()?
                    .ok_or_else(|| CoachError::NotFound("Milestone not found".to_string()))?;
                Milestone::try_from(row)
            })
            .await
    }

    async fn add_tag(&self, user_id: &str, goal_id: &str, name: &str) -> Result<Goal> {
        let user_id = user_id.to_string();
        let goal_id = goal_id.to_string();
        let name = name.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                if find_goal_row(conn, &user_id, &goal_id)?.is_none() {
                    return Err(goal_not_found());
                }
                diesel::insert_or_ignore_into(goal_tags::table)
                    .values(&GoalTagDB {
                        id: Uuid::new_v4().to_string(),
                        goal_id: goal_id.clone(),
                        name,
                        created_at: to_db_timestamp(Utc::now()),
                    })
                    .execute(conn)
                    .into_core()?;
                require_goal(conn, &user_id, &goal_id)
            })
            .await
    }
}
