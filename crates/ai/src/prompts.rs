//! Prompt builders for the coach.
//!
//! The model only ever sees compact projections of the user's data. Summary
//! rewrites get the summary body without its metadata; chat replies get at
//! most [`MAX_CONTEXT_GOALS`] goals and the last [`MAX_HISTORY_MESSAGES`]
//! messages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use goalcoach_core::coach::{ChatContext, ChatRole, CoachMessage, CoachSummary, SummaryRewrite};
use goalcoach_core::goals::{Goal, GoalStatus};

use crate::error::AiError;

pub const MAX_CONTEXT_GOALS: usize = 12;
pub const MAX_HISTORY_MESSAGES: usize = 12;

pub const REWRITE_SYSTEM_PROMPT: &str =
    "You rewrite copy only. Never change structure, order, or numeric values.";

pub const CHAT_SYSTEM_PROMPT: &str =
    "You are an execution-first personal coach. Keep replies under 180 words and action-oriented.";

const REWRITE_SHAPE: &str = r#"{"topPriorities":[{"goalId":"uuid","title":"string","reason":"string","score":number}],"risks":[{"goalId":"uuid","title":"string","category":"schedule|execution|consistency","severity":"low|medium|high","reason":"string"}],"nextActions":[{"goalId":"uuid","action":"string","why":"string"}],"confidence":{"value":0,"band":"low|medium|high"}}"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LatestProgress<'a> {
    value: i32,
    created_at: DateTime<Utc>,
    note: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompactGoal<'a> {
    id: &'a str,
    title: &'a str,
    status: GoalStatus,
    current_progress: i32,
    target_date: Option<DateTime<Utc>>,
    latest_progress: Option<LatestProgress<'a>>,
    next_milestone: Option<&'a str>,
    tags: &'a [String],
}

impl<'a> From<&'a Goal> for CompactGoal<'a> {
    fn from(goal: &'a Goal) -> Self {
        // Progress events arrive newest first.
        let latest_progress = goal.progress_events.first().map(|e| LatestProgress {
            value: e.value,
            created_at: e.created_at,
            note: e.note.as_deref(),
        });
        Self {
            id: &goal.id,
            title: &goal.title,
            status: goal.status,
            current_progress: goal.current_progress,
            target_date: goal.target_date,
            latest_progress,
            next_milestone: goal.next_open_milestone().map(|m| m.title.as_str()),
            tags: &goal.tags,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry<'a> {
    role: ChatRole,
    content: &'a str,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a CoachMessage> for HistoryEntry<'a> {
    fn from(message: &'a CoachMessage) -> Self {
        Self {
            role: message.role,
            content: &message.content,
            created_at: message.created_at,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AiError> {
    serde_json::to_string(value).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

/// User prompt asking the model to reword the text fields of `summary`.
pub fn build_rewrite_prompt(summary: &CoachSummary) -> Result<String, AiError> {
    let payload = SummaryRewrite::from(summary);
    Ok([
        "You are a concise execution writing assistant.",
        "Rewrite text fields for clarity and brevity.",
        "Do NOT change item count, ordering, goalId, category, severity, score, confidence values, or action intent.",
        "Do NOT add new items.",
        "Return valid JSON with this exact shape:",
        REWRITE_SHAPE,
        "Input JSON:",
        &to_json(&payload)?,
    ]
    .join("\n"))
}

/// User prompt for one chat turn.
pub fn build_chat_prompt(context: &ChatContext) -> Result<String, AiError> {
    let goals: Vec<CompactGoal<'_>> = context
        .goals
        .iter()
        .take(MAX_CONTEXT_GOALS)
        .map(CompactGoal::from)
        .collect();
    let skip = context.history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    let history: Vec<HistoryEntry<'_>> = context
        .history
        .iter()
        .skip(skip)
        .map(HistoryEntry::from)
        .collect();

    Ok([
        "You are a personalized execution coach.",
        "Use only the provided user data context. Be concise and specific.",
        "Always provide practical next steps tied to the user's goals.",
        "Do not mention data that is not in context.",
        "Context goals:",
        &to_json(&goals)?,
        "Latest coach summary (if any):",
        &to_json(&context.latest_summary)?,
        "Recent conversation history:",
        &to_json(&history)?,
        "User message:",
        &context.user_message,
    ]
    .join("\n"))
}

/// Decodes a rewrite completion. Models sometimes wrap JSON in a markdown
/// fence even in JSON mode, so a surrounding fence is stripped first.
pub fn parse_rewrite(content: &str) -> Result<SummaryRewrite, AiError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| AiError::InvalidResponse(e.to_string()))
}
