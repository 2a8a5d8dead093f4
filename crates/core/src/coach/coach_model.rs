//! Coach domain models: summaries, cached insights, conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::proposal_model::ActionProposal;
use crate::constants::{DEFAULT_PROPOSAL_TTL_MINUTES, DEFAULT_SUMMARY_TTL_HOURS};
use crate::errors::Error;
use crate::goals::Goal;

/// Where a summary's prose came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Ai,
    Rules,
}

impl SummarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarySource::Ai => "ai",
            SummarySource::Rules => "rules",
        }
    }
}

impl FromStr for SummarySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(SummarySource::Ai),
            "rules" => Ok(SummarySource::Rules),
            other => Err(Error::invalid_input(format!(
                "Unknown summary source: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    /// >= 70 high, >= 40 medium, else low.
    pub fn for_confidence(value: i64) -> Self {
        if value >= 70 {
            Band::High
        } else if value >= 40 {
            Band::Medium
        } else {
            Band::Low
        }
    }

    /// >= 75 high, >= 45 medium, else low.
    pub fn for_risk(score: i64) -> Self {
        if score >= 75 {
            Band::High
        } else if score >= 45 {
            Band::Medium
        } else {
            Band::Low
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Schedule,
    Execution,
    Consistency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityItem {
    pub goal_id: String,
    pub title: String,
    pub reason: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskItem {
    pub goal_id: String,
    pub title: String,
    pub category: RiskCategory,
    pub severity: Band,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub goal_id: String,
    pub action: String,
    pub why: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Confidence {
    pub value: i64,
    pub band: Band,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMeta {
    pub generated_at: DateTime<Utc>,
    pub source: SummarySource,
    pub engine_version: String,
    pub data_window_days: i64,
}

/// Prioritized view of a user's active goals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoachSummary {
    pub top_priorities: Vec<PriorityItem>,
    pub risks: Vec<RiskItem>,
    pub next_actions: Vec<ActionItem>,
    pub confidence: Confidence,
    pub meta: SummaryMeta,
}

/// Summary body as returned by a rewrite model, before it is checked against
/// the summary it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRewrite {
    pub top_priorities: Vec<PriorityItem>,
    pub risks: Vec<RiskItem>,
    pub next_actions: Vec<ActionItem>,
    pub confidence: Confidence,
}

impl From<&CoachSummary> for SummaryRewrite {
    fn from(summary: &CoachSummary) -> Self {
        Self {
            top_priorities: summary.top_priorities.clone(),
            risks: summary.risks.clone(),
            next_actions: summary.next_actions.clone(),
            confidence: summary.confidence,
        }
    }
}

/// Cached summary, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoachInsight {
    pub id: String,
    pub source: SummarySource,
    pub summary: CoachSummary,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoachConversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(Error::invalid_input(format!("Unknown chat role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoachMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub proposed_actions: Vec<ActionProposal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageInput {
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub conversation: CoachConversation,
    pub user_message: CoachMessage,
    pub assistant_message: CoachMessage,
    pub proposed_actions: Vec<ActionProposal>,
}

/// Everything the reply model gets to see for one chat turn.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub goals: Vec<Goal>,
    pub latest_summary: Option<CoachSummary>,
    pub history: Vec<CoachMessage>,
    pub user_message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRate {
    pub window_days: i64,
    pub suggested_actions: i64,
    pub completed_actions: i64,
    pub rate: i64,
}

/// Runtime knobs of the coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoachConfig {
    pub summary_ttl_hours: i64,
    pub proposal_ttl_minutes: i64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            summary_ttl_hours: DEFAULT_SUMMARY_TTL_HOURS,
            proposal_ttl_minutes: DEFAULT_PROPOSAL_TTL_MINUTES,
        }
    }
}
