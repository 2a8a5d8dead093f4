//! Action proposals: confirmable goal mutations derived from chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::Error;
use crate::goals::{Goal, GoalStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalPayload {
    pub goal_id: String,
    pub goal_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
}

impl UpdateGoalPayload {
    pub fn has_changes(&self) -> bool {
        self.title.is_some() || self.details.is_some() || self.target_date.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGoalPayload {
    pub goal_id: String,
    pub goal_title: String,
    /// Status at proposal time, restored on undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<GoalStatus>,
}

/// The mutation a proposal would apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProposedAction {
    CreateGoal(CreateGoalPayload),
    UpdateGoal(UpdateGoalPayload),
    DeleteGoal(DeleteGoalPayload),
}

impl ProposedAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            ProposedAction::CreateGoal(_) => "create_goal",
            ProposedAction::UpdateGoal(_) => "update_goal",
            ProposedAction::DeleteGoal(_) => "delete_goal",
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            ProposedAction::DeleteGoal(_) => RiskLevel::High,
            _ => RiskLevel::Low,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ProposedAction::CreateGoal(p) => format!("Create goal \"{}\"", p.title),
            ProposedAction::UpdateGoal(p) => format!("Update goal \"{}\"", p.goal_title),
            ProposedAction::DeleteGoal(p) => format!("Delete goal \"{}\"", p.goal_title),
        }
    }

    /// Serializes only the payload half, as stored next to `action_type`.
    pub fn payload_json(&self) -> Result<String, Error> {
        let json = match self {
            ProposedAction::CreateGoal(p) => serde_json::to_string(p)?,
            ProposedAction::UpdateGoal(p) => serde_json::to_string(p)?,
            ProposedAction::DeleteGoal(p) => serde_json::to_string(p)?,
        };
        Ok(json)
    }

    /// Rebuilds an action from its stored type tag and payload.
    pub fn from_parts(action_type: &str, payload_json: &str) -> Result<Self, Error> {
        match action_type {
            "create_goal" => Ok(ProposedAction::CreateGoal(serde_json::from_str(
                payload_json,
            )?)),
            "update_goal" => Ok(ProposedAction::UpdateGoal(serde_json::from_str(
                payload_json,
            )?)),
            "delete_goal" => Ok(ProposedAction::DeleteGoal(serde_json::from_str(
                payload_json,
            )?)),
            other => Err(Error::invalid_input(format!(
                "Unknown action type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "high" => Ok(RiskLevel::High),
            other => Err(Error::invalid_input(format!("Unknown risk level: {}", other))),
        }
    }
}

/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Executed,
    Expired,
    Cancelled,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Expired => "expired",
            ProposalStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ProposalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "executed" => Ok(ProposalStatus::Executed),
            "expired" => Ok(ProposalStatus::Expired),
            "cancelled" => Ok(ProposalStatus::Cancelled),
            other => Err(Error::invalid_input(format!(
                "Unknown proposal status: {}",
                other
            ))),
        }
    }
}

/// A proposal produced by the intent parser, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub action: ProposedAction,
    pub label: String,
    pub risk_level: RiskLevel,
}

impl From<ProposedAction> for ProposalDraft {
    fn from(action: ProposedAction) -> Self {
        Self {
            label: action.label(),
            risk_level: action.risk_level(),
            action,
        }
    }
}

/// A persisted proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionProposal {
    pub id: String,
    #[serde(flatten)]
    pub action: ProposedAction,
    pub label: String,
    pub risk_level: RiskLevel,
    pub status: ProposalStatus,
    pub expires_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub conversation_id: String,
    pub message_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteResultType {
    GoalCreated,
    GoalUpdated,
    GoalDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub result_type: ExecuteResultType,
    pub proposal_status: ProposalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_expires_at: Option<DateTime<Utc>>,
}

/// What a storage-level execute job committed.
///
/// `Expired` means the job persisted the `pending -> expired` flip; callers
/// report it as a conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    Executed(ExecuteResult),
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub goal: Goal,
    pub goal_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteProposalInput {
    pub confirm_text: Option<String>,
}
