//! Database models for coach insights, completions and conversations.

use diesel::prelude::*;

use goalcoach_core::coach::{
    ActionProposal, ChatRole, CoachConversation, CoachInsight, CoachMessage, CoachSummary,
};
use goalcoach_core::constants::DEFAULT_CONVERSATION_TITLE;
use goalcoach_core::Result;

use crate::schema::{coach_action_completions, coach_conversations, coach_insights, coach_messages};
use crate::utils::from_db_timestamp;

/// Cached summary, one row per user. The summary is stored as JSON.
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = coach_insights)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoachInsightDB {
    pub id: String,
    pub user_id: String,
    pub source: String,
    pub summary_json: String,
    pub created_at: String,
    pub expires_at: String,
}

impl CoachInsightDB {
    pub fn into_insight(self) -> Result<CoachInsight> {
        let summary: CoachSummary = serde_json::from_str(&self.summary_json)?;
        Ok(CoachInsight {
            source: self.source.parse()?,
            created_at: from_db_timestamp(&self.created_at)?,
            expires_at: from_db_timestamp(&self.expires_at)?,
            id: self.id,
            summary,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = coach_action_completions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoachActionCompletionDB {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub insight_id: String,
    pub completed_at: String,
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = coach_conversations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoachConversationDB {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CoachConversationDB {
    pub fn into_conversation(self) -> Result<CoachConversation> {
        Ok(CoachConversation {
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string()),
            created_at: from_db_timestamp(&self.created_at)?,
            updated_at: from_db_timestamp(&self.updated_at)?,
            id: self.id,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = coach_messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoachMessageDB {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl CoachMessageDB {
    pub fn into_message(self, proposed_actions: Vec<ActionProposal>) -> Result<CoachMessage> {
        let role: ChatRole = self.role.parse()?;
        Ok(CoachMessage {
            created_at: from_db_timestamp(&self.created_at)?,
            id: self.id,
            conversation_id: self.conversation_id,
            role,
            content: self.content,
            proposed_actions,
        })
    }
}
