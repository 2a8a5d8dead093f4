use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use goalcoach_core::coach::{
    ActionProposal, CoachError, ExecuteOutcome, ExecuteResult, ExecuteResultType, ProposalDraft,
    ProposalRepositoryTrait, ProposalStatus, ProposedAction, UndoResult,
};
use goalcoach_core::constants::{DELETE_CONFIRM_TEXT, UNDO_WINDOW_SECONDS};
use goalcoach_core::goals::{GoalStatus, GoalUpdate, NewGoal};
use goalcoach_core::Result;

use super::model::ActionProposalDB;
use crate::coach::expire_insight;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::goals::{apply_goal_update, insert_goal_row};
use crate::schema::coach_action_proposals::dsl as proposals;
use crate::schema::{coach_conversations, coach_messages};
use crate::utils::to_db_timestamp;

fn find_proposal_row(
    conn: &mut SqliteConnection,
    user_id: &str,
    proposal_id: &str,
) -> Result<Option<ActionProposalDB>> {
    proposals::coach_action_proposals
        .filter(proposals::id.eq(proposal_id))
        .filter(proposals::user_id.eq(user_id))
        .select(ActionProposalDB::as_select())
        .first::<ActionProposalDB>(conn)
        .optional()
        .into_core()
}

fn require_proposal(
    conn: &mut SqliteConnection,
    user_id: &str,
    proposal_id: &str,
) -> Result<ActionProposal> {
    find_proposal_row(conn, user_id, proposal_id)?
        .ok_or_else(|| CoachError::NotFound("Action proposal not found".to_string()))?
        .into_proposal()
}

/// Fails unless the conversation belongs to `user_id` and holds the message.
fn require_message_in_conversation(
    conn: &mut SqliteConnection,
    user_id: &str,
    conversation_id: &str,
    message_id: &str,
) -> Result<()> {
    let conversations = coach_conversations::table
        .filter(coach_conversations::id.eq(conversation_id))
        .filter(coach_conversations::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .into_core()?;
    if conversations == 0 {
        return Err(CoachError::NotFound("Conversation not found".to_string()).into());
    }

    let messages = coach_messages::table
        .filter(coach_messages::id.eq(message_id))
        .filter(coach_messages::conversation_id.eq(conversation_id))
        .count()
        .get_result::<i64>(conn)
        .into_core()?;
    if messages == 0 {
        return Err(CoachError::NotFound("Assistant message not found".to_string()).into());
    }
    Ok(())
}

/// Inserts pending proposals for one assistant message.
pub(crate) fn insert_proposals(
    conn: &mut SqliteConnection,
    user_id: &str,
    conversation_id: &str,
    message_id: &str,
    drafts: &[ProposalDraft],
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<ActionProposal>> {
    require_message_in_conversation(conn, user_id, conversation_id, message_id)?;

    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let row = ActionProposalDB::pending(
            user_id,
            conversation_id,
            message_id,
            draft,
            expires_at,
            now,
        )?;
        diesel::insert_into(proposals::coach_action_proposals)
            .values(&row)
            .execute(conn)
            .into_core()?;
        created.push(row.into_proposal()?);
    }
    Ok(created)
}

/// Proposals attached to `message_ids`, grouped by message, in creation order.
pub(crate) fn load_proposals_by_message(
    conn: &mut SqliteConnection,
    message_ids: &[String],
) -> Result<HashMap<String, Vec<ActionProposal>>> {
    let mut grouped: HashMap<String, Vec<ActionProposal>> = HashMap::new();
    if message_ids.is_empty() {
        return Ok(grouped);
    }
    let rows = proposals::coach_action_proposals
        .filter(proposals::message_id.eq_any(message_ids))
        .order((proposals::created_at.asc(), proposals::id.asc()))
        .select(ActionProposalDB::as_select())
        .load::<ActionProposalDB>(conn)
        .into_core()?;
    for row in rows {
        let proposal = row.into_proposal()?;
        grouped
            .entry(proposal.message_id.clone())
            .or_default()
            .push(proposal);
    }
    Ok(grouped)
}

fn execute_in_tx(
    conn: &mut SqliteConnection,
    user_id: &str,
    proposal_id: &str,
    confirm_text: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ExecuteOutcome> {
    let proposal = require_proposal(conn, user_id, proposal_id)?;
    let now_ts = to_db_timestamp(now);

    if proposal.expires_at <= now {
        // Commit the flip; the caller reports the conflict.
        diesel::update(
            proposals::coach_action_proposals
                .filter(proposals::id.eq(&proposal.id))
                .filter(proposals::status.eq(ProposalStatus::Pending.as_str())),
        )
        .set(proposals::status.eq(ProposalStatus::Expired.as_str()))
        .execute(conn)
        .into_core()?;
        return Ok(ExecuteOutcome::Expired);
    }

    if matches!(proposal.action, ProposedAction::DeleteGoal(_))
        && confirm_text.map(str::trim) != Some(DELETE_CONFIRM_TEXT)
    {
        return Err(
            CoachError::BadRequest(format!("Please type {} to confirm.", DELETE_CONFIRM_TEXT))
                .into(),
        );
    }

    let claimed = diesel::update(
        proposals::coach_action_proposals
            .filter(proposals::id.eq(&proposal.id))
            .filter(proposals::user_id.eq(user_id))
            .filter(proposals::status.eq(ProposalStatus::Pending.as_str()))
            .filter(proposals::expires_at.gt(&now_ts)),
    )
    .set((
        proposals::status.eq(ProposalStatus::Executed.as_str()),
        proposals::executed_at.eq(Some(&now_ts)),
    ))
    .execute(conn)
    .into_core()?;
    if claimed == 0 {
        return Err(CoachError::Conflict("Action proposal already processed".to_string()).into());
    }

    let result = match proposal.action {
        ProposedAction::CreateGoal(payload) => {
            let goal = insert_goal_row(
                conn,
                user_id,
                NewGoal {
                    title: payload.title,
                    details: payload.details,
                    target_date: payload.target_date,
                },
                now,
            )?;
            ExecuteResult {
                result_type: ExecuteResultType::GoalCreated,
                proposal_status: ProposalStatus::Executed,
                goal_id: Some(goal.id.clone()),
                goal: Some(goal),
                undo_expires_at: None,
            }
        }
        ProposedAction::UpdateGoal(payload) => {
            let update = GoalUpdate {
                title: payload.title,
                details: payload.details,
                target_date: payload.target_date,
                ..Default::default()
            };
            let goal = apply_goal_update(conn, user_id, &payload.goal_id, &update, now)?;
            ExecuteResult {
                result_type: ExecuteResultType::GoalUpdated,
                proposal_status: ProposalStatus::Executed,
                goal: Some(goal),
                goal_id: Some(payload.goal_id),
                undo_expires_at: None,
            }
        }
        ProposedAction::DeleteGoal(payload) => {
            let archive = GoalUpdate {
                status: Some(GoalStatus::Archived),
                ..Default::default()
            };
            apply_goal_update(conn, user_id, &payload.goal_id, &archive, now)?;
            ExecuteResult {
                result_type: ExecuteResultType::GoalDeleted,
                proposal_status: ProposalStatus::Executed,
                goal: None,
                goal_id: Some(payload.goal_id),
                undo_expires_at: Some(now + Duration::seconds(UNDO_WINDOW_SECONDS)),
            }
        }
    };

    expire_insight(conn, user_id, now)?;
    Ok(ExecuteOutcome::Executed(result))
}

fn undo_in_tx(
    conn: &mut SqliteConnection,
    user_id: &str,
    proposal_id: &str,
    now: DateTime<Utc>,
) -> Result<UndoResult> {
    let proposal = require_proposal(conn, user_id, proposal_id)?;
    let ProposedAction::DeleteGoal(payload) = proposal.action else {
        return Err(CoachError::BadRequest("Only delete actions can be undone".to_string()).into());
    };
    let executed_at = match (proposal.status, proposal.executed_at) {
        (ProposalStatus::Executed, Some(executed_at)) => executed_at,
        _ => return Err(CoachError::Conflict("Action is not undoable".to_string()).into()),
    };
    if executed_at + Duration::seconds(UNDO_WINDOW_SECONDS) <= now {
        return Err(CoachError::Conflict("Undo window expired".to_string()).into());
    }

    let cancelled = diesel::update(
        proposals::coach_action_proposals
            .filter(proposals::id.eq(&proposal.id))
            .filter(proposals::status.eq(ProposalStatus::Executed.as_str())),
    )
    .set(proposals::status.eq(ProposalStatus::Cancelled.as_str()))
    .execute(conn)
    .into_core()?;
    if cancelled == 0 {
        return Err(CoachError::Conflict("Action is not undoable".to_string()).into());
    }

    let restore = GoalUpdate {
        status: Some(payload.previous_status.unwrap_or(GoalStatus::Active)),
        ..Default::default()
    };
    let goal = apply_goal_update(conn, user_id, &payload.goal_id, &restore, now)?;
    expire_insight(conn, user_id, now)?;

    Ok(UndoResult {
        goal,
        goal_id: payload.goal_id,
    })
}

/// Proposal store and executor. Execute and undo each run as one writer job,
/// so the status guard, the goal mutation and the cache invalidation commit
/// or roll back together.
pub struct ProposalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ProposalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ProposalRepositoryTrait for ProposalRepository {
    fn get_proposal(&self, user_id: &str, proposal_id: &str) -> Result<Option<ActionProposal>> {
        let mut conn = get_connection(&self.pool)?;
        find_proposal_row(&mut conn, user_id, proposal_id)?
            .map(ActionProposalDB::into_proposal)
            .transpose()
    }

    async fn create_proposals(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        drafts: Vec<ProposalDraft>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActionProposal>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let user_id = user_id.to_string();
        let conversation_id = conversation_id.to_string();
        let message_id = message_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<ActionProposal>> {
                insert_proposals(
                    conn,
                    &user_id,
                    &conversation_id,
                    &message_id,
                    &drafts,
                    expires_at,
                    now,
                )
            })
            .await
    }

    async fn execute_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        confirm_text: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ExecuteOutcome> {
        let user_id = user_id.to_string();
        let proposal_id = proposal_id.to_string();
        debug!("Executing action proposal {}", proposal_id);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ExecuteOutcome> {
                execute_in_tx(conn, &user_id, &proposal_id, confirm_text.as_deref(), now)
            })
            .await
    }

    async fn undo_delete_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UndoResult> {
        let user_id = user_id.to_string();
        let proposal_id = proposal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UndoResult> {
                undo_in_tx(conn, &user_id, &proposal_id, now)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::CoachRepository;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use crate::goals::GoalRepository;
    use goalcoach_core::coach::{
        compute_summary, ChatRole, CoachRepositoryTrait, CreateGoalPayload, DeleteGoalPayload,
        SummarySource, UpdateGoalPayload,
    };
    use goalcoach_core::goals::GoalRepositoryTrait;
    use chrono::TimeZone;
    use goalcoach_core::Error;
    use tempfile::tempdir;

    const USER: &str = "user-1";

    struct Fixture {
        goals: GoalRepository,
        coach: CoachRepository,
        proposals: Arc<ProposalRepository>,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer(&pool).expect("Failed to spawn writer");
        Fixture {
            goals: GoalRepository::new(Arc::clone(&pool), writer.clone()),
            coach: CoachRepository::new(Arc::clone(&pool), writer.clone()),
            proposals: Arc::new(ProposalRepository::new(pool, writer)),
            _dir: dir,
        }
    }

    /// Stores an assistant message carrying `action` and returns its proposal.
    async fn propose(
        fx: &Fixture,
        action: ProposedAction,
        now: DateTime<Utc>,
    ) -> ActionProposal {
        let conversation = fx
            .coach
            .create_conversation(USER, None, now)
            .await
            .expect("conversation");
        let message = fx
            .coach
            .add_assistant_reply(
                USER,
                &conversation.id,
                "Here you go".to_string(),
                vec![ProposalDraft::from(action)],
                now + Duration::minutes(15),
                now,
            )
            .await
            .expect("assistant reply");
        message
            .proposed_actions
            .into_iter()
            .next()
            .expect("one proposal")
    }

    fn create_action(title: &str) -> ProposedAction {
        ProposedAction::CreateGoal(CreateGoalPayload {
            title: title.to_string(),
            details: None,
            target_date: None,
        })
    }

    async fn insert_goal(fx: &Fixture, title: &str) -> goalcoach_core::goals::Goal {
        fx.goals
            .insert_goal(
                USER,
                NewGoal {
                    title: title.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("goal")
    }

    fn delete_action(goal: &goalcoach_core::goals::Goal) -> ProposedAction {
        ProposedAction::DeleteGoal(DeleteGoalPayload {
            goal_id: goal.id.clone(),
            goal_title: goal.title.clone(),
            previous_status: Some(goal.status),
        })
    }

    #[tokio::test]
    async fn test_execute_create_then_second_execute_conflicts() {
        let fx = setup().await;
        let now = Utc::now();
        let proposal = propose(&fx, create_action("Run a marathon"), now).await;
        assert_eq!(proposal.status, ProposalStatus::Pending);

        let outcome = fx
            .proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await
            .unwrap();
        let ExecuteOutcome::Executed(result) = outcome else {
            panic!("expected an executed outcome");
        };
        assert_eq!(result.result_type, ExecuteResultType::GoalCreated);
        let goal_id = result.goal_id.unwrap();
        assert!(fx.goals.get_goal(USER, &goal_id).unwrap().is_some());

        let stored = fx.proposals.get_proposal(USER, &proposal.id).unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Executed);
        assert!(stored.executed_at.is_some());

        let again = fx
            .proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await;
        assert!(matches!(again, Err(Error::Coach(CoachError::Conflict(_)))));
        assert_eq!(fx.goals.load_goals(USER).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_proposal_flip_is_persisted() {
        let fx = setup().await;
        let now = Utc::now();
        let proposal = propose(&fx, create_action("Learn Spanish"), now).await;

        let later = now + Duration::minutes(16);
        let outcome = fx
            .proposals
            .execute_proposal(USER, &proposal.id, None, later)
            .await
            .unwrap();
        assert_eq!(outcome, ExecuteOutcome::Expired);

        let stored = fx.proposals.get_proposal(USER, &proposal.id).unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Expired);
        assert!(fx.goals.load_goals(USER).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation_text() {
        let fx = setup().await;
        let now = Utc::now();
        let goal = insert_goal(&fx, "Read 12 books").await;
        let proposal = propose(&fx, delete_action(&goal), now).await;

        for confirm in [None, Some("delete".to_string()), Some("yes".to_string())] {
            let result = fx
                .proposals
                .execute_proposal(USER, &proposal.id, confirm, now)
                .await;
            assert!(matches!(result, Err(Error::Coach(CoachError::BadRequest(_)))));
        }
        let untouched = fx.goals.get_goal(USER, &goal.id).unwrap().unwrap();
        assert_eq!(untouched.status, GoalStatus::Active);
        let stored = fx.proposals.get_proposal(USER, &proposal.id).unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Pending);

        let outcome = fx
            .proposals
            .execute_proposal(USER, &proposal.id, Some("  DELETE ".to_string()), now)
            .await
            .unwrap();
        let ExecuteOutcome::Executed(result) = outcome else {
            panic!("expected an executed outcome");
        };
        assert_eq!(result.result_type, ExecuteResultType::GoalDeleted);
        assert_eq!(
            result.undo_expires_at,
            Some(now + Duration::seconds(UNDO_WINDOW_SECONDS))
        );
        let archived = fx.goals.get_goal(USER, &goal.id).unwrap().unwrap();
        assert_eq!(archived.status, GoalStatus::Archived);
    }

    #[tokio::test]
    async fn test_undo_delete_inside_and_outside_window() {
        let fx = setup().await;
        let now = Utc::now();
        let goal = insert_goal(&fx, "Ship the side project").await;

        let first = propose(&fx, delete_action(&goal), now).await;
        fx.proposals
            .execute_proposal(USER, &first.id, Some("DELETE".to_string()), now)
            .await
            .unwrap();
        let undone = fx
            .proposals
            .undo_delete_proposal(USER, &first.id, now + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(undone.goal_id, goal.id);
        assert_eq!(undone.goal.status, GoalStatus::Active);
        let stored = fx.proposals.get_proposal(USER, &first.id).unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Cancelled);

        let again = fx
            .proposals
            .undo_delete_proposal(USER, &first.id, now + Duration::seconds(11))
            .await;
        assert!(matches!(again, Err(Error::Coach(CoachError::Conflict(_)))));

        let second = propose(&fx, delete_action(&goal), now).await;
        fx.proposals
            .execute_proposal(USER, &second.id, Some("DELETE".to_string()), now)
            .await
            .unwrap();
        let late = fx
            .proposals
            .undo_delete_proposal(USER, &second.id, now + Duration::seconds(31))
            .await;
        assert!(matches!(late, Err(Error::Coach(CoachError::Conflict(_)))));
        let still_archived = fx.goals.get_goal(USER, &goal.id).unwrap().unwrap();
        assert_eq!(still_archived.status, GoalStatus::Archived);
    }

    #[tokio::test]
    async fn test_undo_rejects_non_delete_actions() {
        let fx = setup().await;
        let now = Utc::now();
        let proposal = propose(&fx, create_action("Meditate daily"), now).await;
        fx.proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await
            .unwrap();

        let result = fx.proposals.undo_delete_proposal(USER, &proposal.id, now).await;
        assert!(matches!(result, Err(Error::Coach(CoachError::BadRequest(_)))));
    }

    #[tokio::test]
    async fn test_execute_expires_cached_insight() {
        let fx = setup().await;
        let now = Utc::now();
        let summary = compute_summary(&[], now);
        fx.coach
            .upsert_insight(
                USER,
                SummarySource::Rules,
                summary,
                now + Duration::hours(24),
                now,
            )
            .await
            .unwrap();
        assert!(fx.coach.get_valid_insight(USER, now).unwrap().is_some());

        let proposal = propose(&fx, create_action("Sleep by 11pm"), now).await;
        fx.proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await
            .unwrap();

        assert!(fx.coach.get_valid_insight(USER, now).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_user_cannot_see_or_execute_proposal() {
        let fx = setup().await;
        let now = Utc::now();
        let proposal = propose(&fx, create_action("Swim weekly"), now).await;

        assert!(fx.proposals.get_proposal("intruder", &proposal.id).unwrap().is_none());
        let result = fx
            .proposals
            .execute_proposal("intruder", &proposal.id, None, now)
            .await;
        assert!(matches!(result, Err(Error::Coach(CoachError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_concurrent_execute_applies_once() {
        let fx = setup().await;
        let now = Utc::now();
        let proposal = propose(&fx, create_action("Save an emergency fund"), now).await;

        let attempts = (0..8).map(|_| {
            let repo = Arc::clone(&fx.proposals);
            let id = proposal.id.clone();
            tokio::spawn(async move { repo.execute_proposal(USER, &id, None, now).await })
        });
        let results = futures::future::join_all(attempts).await;

        let succeeded = results
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .filter(|r| matches!(r, Ok(ExecuteOutcome::Executed(_))))
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(fx.goals.load_goals(USER).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_proposals_requires_owned_conversation() {
        let fx = setup().await;
        let now = Utc::now();
        let conversation = fx.coach.create_conversation(USER, None, now).await.unwrap();
        let message = fx
            .coach
            .add_message(
                USER,
                &conversation.id,
                ChatRole::Assistant,
                "Want me to add it?".to_string(),
                now,
            )
            .await
            .unwrap();

        let result = fx
            .proposals
            .create_proposals(
                "intruder",
                &conversation.id,
                &message.id,
                vec![ProposalDraft::from(create_action("Plant a garden"))],
                now + Duration::minutes(15),
                now,
            )
            .await;
        assert!(matches!(result, Err(Error::Coach(CoachError::NotFound(_)))));

        let messages = fx.coach.list_messages(USER, &conversation.id).unwrap();
        assert!(messages[0].proposed_actions.is_empty());
    }

    #[tokio::test]
    async fn test_create_proposals_requires_message_in_conversation() {
        let fx = setup().await;
        let now = Utc::now();
        let first = fx.coach.create_conversation(USER, None, now).await.unwrap();
        let second = fx.coach.create_conversation(USER, None, now).await.unwrap();
        let message = fx
            .coach
            .add_message(
                USER,
                &first.id,
                ChatRole::Assistant,
                "Noted.".to_string(),
                now,
            )
            .await
            .unwrap();

        let result = fx
            .proposals
            .create_proposals(
                USER,
                &second.id,
                &message.id,
                vec![ProposalDraft::from(create_action("Plant a garden"))],
                now + Duration::minutes(15),
                now,
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::Coach(CoachError::NotFound(ref msg))) if msg == "Assistant message not found"
        ));

        let created = fx
            .proposals
            .create_proposals(
                USER,
                &first.id,
                &message.id,
                vec![ProposalDraft::from(create_action("Plant a garden"))],
                now + Duration::minutes(15),
                now,
            )
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].conversation_id, first.id);
    }

    #[tokio::test]
    async fn test_executed_create_matches_payload() {
        let fx = setup().await;
        let now = Utc::now();
        let target = Utc.with_ymd_and_hms(2026, 9, 1, 8, 15, 30).unwrap()
            + Duration::milliseconds(250);
        let action = ProposedAction::CreateGoal(CreateGoalPayload {
            title: "Learn Spanish".to_string(),
            details: Some("Twenty minutes of practice every evening".to_string()),
            target_date: Some(target),
        });
        let proposal = propose(&fx, action, now).await;

        let ExecuteOutcome::Executed(result) = fx
            .proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await
            .unwrap()
        else {
            panic!("expected an executed outcome");
        };
        let goal = result.goal.expect("created goal");
        assert_eq!(goal.title, "Learn Spanish");
        assert_eq!(
            goal.details.as_deref(),
            Some("Twenty minutes of practice every evening")
        );
        assert_eq!(goal.target_date, Some(target));

        let stored = fx.goals.get_goal(USER, &goal.id).unwrap().unwrap();
        assert_eq!(stored.title, goal.title);
        assert_eq!(stored.details, goal.details);
        assert_eq!(stored.target_date, Some(target));
    }

    #[tokio::test]
    async fn test_executed_update_changes_only_payload_fields() {
        let fx = setup().await;
        let now = Utc::now();
        let original_target = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let goal = fx
            .goals
            .insert_goal(
                USER,
                NewGoal {
                    title: "Run a marathon".to_string(),
                    details: Some("Follow the 16 week plan".to_string()),
                    target_date: Some(original_target),
                },
            )
            .await
            .unwrap();
        fx.goals
            .add_progress_event(
                USER,
                &goal.id,
                goalcoach_core::goals::NewProgressEvent {
                    value: 35,
                    note: None,
                },
            )
            .await
            .unwrap();

        let action = ProposedAction::UpdateGoal(UpdateGoalPayload {
            goal_id: goal.id.clone(),
            goal_title: goal.title.clone(),
            title: Some("Run a half marathon".to_string()),
            details: None,
            target_date: None,
        });
        let proposal = propose(&fx, action, now).await;
        let ExecuteOutcome::Executed(result) = fx
            .proposals
            .execute_proposal(USER, &proposal.id, None, now)
            .await
            .unwrap()
        else {
            panic!("expected an executed outcome");
        };
        assert_eq!(result.result_type, ExecuteResultType::GoalUpdated);

        let stored = fx.goals.get_goal(USER, &goal.id).unwrap().unwrap();
        assert_eq!(stored.title, "Run a half marathon");
        assert_eq!(stored.details.as_deref(), Some("Follow the 16 week plan"));
        assert_eq!(stored.target_date, Some(original_target));
        assert_eq!(stored.current_progress, 35);
        assert_eq!(stored.status, GoalStatus::Active);
    }
}
