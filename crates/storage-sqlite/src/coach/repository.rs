use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use goalcoach_core::coach::{
    ChatRole, CoachConversation, CoachError, CoachInsight, CoachMessage, CoachRepositoryTrait,
    CoachSummary, ProposalDraft, SummarySource,
};
use goalcoach_core::constants::CONVERSATION_TITLE_MAX_CHARS;
use goalcoach_core::{Error, Result};

use super::model::{CoachActionCompletionDB, CoachConversationDB, CoachInsightDB, CoachMessageDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::proposals::{insert_proposals, load_proposals_by_message};
use crate::schema::{coach_action_completions, coach_conversations, coach_insights, coach_messages};
use crate::utils::to_db_timestamp;

fn conversation_not_found() -> Error {
    CoachError::NotFound("Conversation not found".to_string()).into()
}

/// Invalidates the user's cached summary by moving its expiry to `now`.
/// The row stays so completions can still reference it.
pub(crate) fn expire_insight(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let now_ts = to_db_timestamp(now);
    diesel::update(
        coach_insights::table
            .filter(coach_insights::user_id.eq(user_id))
            .filter(coach_insights::expires_at.gt(&now_ts)),
    )
    .set(coach_insights::expires_at.eq(&now_ts))
    .execute(conn)
    .into_core()?;
    Ok(())
}

fn find_conversation_row(
    conn: &mut SqliteConnection,
    user_id: &str,
    conversation_id: &str,
) -> Result<Option<CoachConversationDB>> {
    coach_conversations::table
        .filter(coach_conversations::id.eq(conversation_id))
        .filter(coach_conversations::user_id.eq(user_id))
        .select(CoachConversationDB::as_select())
        .first::<CoachConversationDB>(conn)
        .optional()
        .into_core()
}

/// Inserts a message and bumps the conversation. A user message also becomes
/// the conversation title.
fn insert_message(
    conn: &mut SqliteConnection,
    user_id: &str,
    conversation_id: &str,
    role: ChatRole,
    content: String,
    now: DateTime<Utc>,
) -> Result<CoachMessageDB> {
    if find_conversation_row(conn, user_id, conversation_id)?.is_none() {
        return Err(conversation_not_found());
    }
    let timestamp = to_db_timestamp(now);
    let row = CoachMessageDB {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation_id.to_string(),
        role: role.as_str().to_string(),
        content,
        created_at: timestamp.clone(),
    };
    diesel::insert_into(coach_messages::table)
        .values(&row)
        .execute(conn)
        .into_core()?;

    let target = coach_conversations::table.filter(coach_conversations::id.eq(conversation_id));
    if role == ChatRole::User {
        let title: String = row.content.chars().take(CONVERSATION_TITLE_MAX_CHARS).collect();
        diesel::update(target)
            .set((
                coach_conversations::updated_at.eq(&timestamp),
                coach_conversations::title.eq(Some(title)),
            ))
            .execute(conn)
            .into_core()?;
    } else {
        diesel::update(target)
            .set(coach_conversations::updated_at.eq(&timestamp))
            .execute(conn)
            .into_core()?;
    }
    Ok(row)
}

pub struct CoachRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CoachRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CoachRepositoryTrait for CoachRepository {
    fn get_valid_insight(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CoachInsight>> {
        let mut conn = get_connection(&self.pool)?;
        coach_insights::table
            .filter(coach_insights::user_id.eq(user_id))
            .filter(coach_insights::expires_at.gt(to_db_timestamp(now)))
            .select(CoachInsightDB::as_select())
            .first::<CoachInsightDB>(&mut conn)
            .optional()
            .into_core()?
            .map(CoachInsightDB::into_insight)
            .transpose()
    }

    fn get_insight(&self, user_id: &str, insight_id: &str) -> Result<Option<CoachInsight>> {
        let mut conn = get_connection(&self.pool)?;
        coach_insights::table
            .filter(coach_insights::id.eq(insight_id))
            .filter(coach_insights::user_id.eq(user_id))
            .select(CoachInsightDB::as_select())
            .first::<CoachInsightDB>(&mut conn)
            .optional()
            .into_core()?
            .map(CoachInsightDB::into_insight)
            .transpose()
    }

    async fn upsert_insight(
        &self,
        user_id: &str,
        source: SummarySource,
        summary: CoachSummary,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CoachInsight> {
        let row = CoachInsightDB {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source: source.as_str().to_string(),
            summary_json: serde_json::to_string(&summary)?,
            created_at: to_db_timestamp(now),
            expires_at: to_db_timestamp(expires_at),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CoachInsight> {
                // One slot per user: the id and created_at of an existing row are kept.
                diesel::insert_into(coach_insights::table)
                    .values(&row)
                    .on_conflict(coach_insights::user_id)
                    .do_update()
                    .set((
                        coach_insights::source.eq(&row.source),
                        coach_insights::summary_json.eq(&row.summary_json),
                        coach_insights::expires_at.eq(&row.expires_at),
                    ))
                    .returning(CoachInsightDB::as_returning())
                    .get_result::<CoachInsightDB>(conn)
                    .into_core()?
                    .into_insight()
            })
            .await
    }

    fn list_insight_summaries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CoachSummary>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = coach_insights::table
            .filter(coach_insights::user_id.eq(user_id))
            .filter(coach_insights::created_at.ge(to_db_timestamp(since)))
            .select(coach_insights::summary_json)
            .load::<String>(&mut conn)
            .into_core()?;
        rows.iter()
            .map(|json| serde_json::from_str::<CoachSummary>(json).map_err(Error::from))
            .collect()
    }

    async fn create_action_completion(
        &self,
        user_id: &str,
        goal_id: &str,
        insight_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let row = CoachActionCompletionDB {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal_id: goal_id.to_string(),
            insight_id: insight_id.to_string(),
            completed_at: to_db_timestamp(now),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(coach_action_completions::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    fn count_completions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        coach_action_completions::table
            .filter(coach_action_completions::user_id.eq(user_id))
            .filter(coach_action_completions::completed_at.ge(to_db_timestamp(since)))
            .count()
            .get_result::<i64>(&mut conn)
            .into_core()
    }

    fn list_conversations(&self, user_id: &str) -> Result<Vec<CoachConversation>> {
        let mut conn = get_connection(&self.pool)?;
        coach_conversations::table
            .filter(coach_conversations::user_id.eq(user_id))
            .order((
                coach_conversations::updated_at.desc(),
                coach_conversations::id.desc(),
            ))
            .select(CoachConversationDB::as_select())
            .load::<CoachConversationDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(CoachConversationDB::into_conversation)
            .collect()
    }

    fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<CoachConversation>> {
        let mut conn = get_connection(&self.pool)?;
        find_conversation_row(&mut conn, user_id, conversation_id)?
            .map(CoachConversationDB::into_conversation)
            .transpose()
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CoachConversation> {
        let timestamp = to_db_timestamp(now);
        let row = CoachConversationDB {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CoachConversation> {
                diesel::insert_into(coach_conversations::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                row.into_conversation()
            })
            .await
    }

    fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<CoachMessage>> {
        let mut conn = get_connection(&self.pool)?;
        if find_conversation_row(&mut conn, user_id, conversation_id)?.is_none() {
            return Ok(Vec::new());
        }
        let rows = coach_messages::table
            .filter(coach_messages::conversation_id.eq(conversation_id))
            .order((coach_messages::created_at.asc(), coach_messages::id.asc()))
            .select(CoachMessageDB::as_select())
            .load::<CoachMessageDB>(&mut conn)
            .into_core()?;
        let ids: Vec<String> = rows.iter().map(|m| m.id.clone()).collect();
        let mut proposals = load_proposals_by_message(&mut conn, &ids)?;
        rows.into_iter()
            .map(|row| {
                let attached = proposals.remove(&row.id).unwrap_or_default();
                row.into_message(attached)
            })
            .collect()
    }

    async fn add_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: ChatRole,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<CoachMessage> {
        let user_id = user_id.to_string();
        let conversation_id = conversation_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CoachMessage> {
                insert_message(conn, &user_id, &conversation_id, role, content, now)?
                    .into_message(Vec::new())
            })
            .await
    }

    async fn add_assistant_reply(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: String,
        drafts: Vec<ProposalDraft>,
        proposal_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CoachMessage> {
        let user_id = user_id.to_string();
        let conversation_id = conversation_id.to_string();
        debug!(
            "Storing assistant reply with {} proposal(s) in conversation {}",
            drafts.len(),
            conversation_id
        );
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CoachMessage> {
                let message = insert_message(
                    conn,
                    &user_id,
                    &conversation_id,
                    ChatRole::Assistant,
                    content,
                    now,
                )?;
                let proposals = insert_proposals(
                    conn,
                    &user_id,
                    &conversation_id,
                    &message.id,
                    &drafts,
                    proposal_expires_at.max(now + Duration::milliseconds(1)),
                    now,
                )?;
                message.into_message(proposals)
            })
            .await
    }
}
