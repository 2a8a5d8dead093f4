//! Database model for coach action proposals.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use goalcoach_core::coach::{ActionProposal, ProposalDraft, ProposalStatus, ProposedAction};
use goalcoach_core::Result;

use crate::schema::coach_action_proposals;
use crate::utils::{from_db_timestamp, from_db_timestamp_opt, to_db_timestamp};

/// A proposal row. The action payload is stored as JSON next to its type tag.
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = coach_action_proposals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActionProposalDB {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub action_type: String,
    pub label: String,
    pub payload_json: String,
    pub risk_level: String,
    pub status: String,
    pub expires_at: String,
    pub executed_at: Option<String>,
    pub created_at: String,
}

impl ActionProposalDB {
    pub fn pending(
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        draft: &ProposalDraft,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            action_type: draft.action.action_type().to_string(),
            label: draft.label.clone(),
            payload_json: draft.action.payload_json()?,
            risk_level: draft.risk_level.as_str().to_string(),
            status: ProposalStatus::Pending.as_str().to_string(),
            expires_at: to_db_timestamp(expires_at),
            executed_at: None,
            created_at: to_db_timestamp(now),
        })
    }

    pub fn into_proposal(self) -> Result<ActionProposal> {
        Ok(ActionProposal {
            action: ProposedAction::from_parts(&self.action_type, &self.payload_json)?,
            risk_level: self.risk_level.parse()?,
            status: self.status.parse()?,
            expires_at: from_db_timestamp(&self.expires_at)?,
            executed_at: from_db_timestamp_opt(self.executed_at.as_deref())?,
            created_at: from_db_timestamp(&self.created_at)?,
            id: self.id,
            label: self.label,
            conversation_id: self.conversation_id,
            message_id: self.message_id,
        })
    }
}
