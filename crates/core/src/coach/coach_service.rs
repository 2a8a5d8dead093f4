use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::coach_errors::CoachError;
use super::coach_model::{
    ChatContext, ChatMessageInput, ChatReply, ChatRole, CoachConfig, CoachConversation,
    CoachInsight, CoachMessage, CoachSummary, CompletionRate,
};
use super::coach_traits::{
    reply_tokens, Clock, CoachAiTrait, CoachRepositoryTrait, CoachServiceTrait, OnToken,
    ProposalRepositoryTrait, SystemClock,
};
use super::intent::{parse_intent, GoalCandidate};
use super::proposal_model::{
    ActionProposal, ExecuteOutcome, ExecuteResult, ProposalDraft, UndoResult,
};
use super::scoring::compute_summary;
use super::summary_validation::validate_rewrite;
use crate::constants::{
    CONVERSATION_TITLE_MAX_CHARS, DEFAULT_COMPLETION_WINDOW_DAYS, MAX_CHAT_MESSAGE_CHARS,
    MAX_COMPLETION_WINDOW_DAYS,
};
use crate::errors::Result;
use crate::goals::{Goal, GoalRepositoryTrait};

const EMPTY_FALLBACK_REPLY: &str =
    "Start with one 30-minute planning block and define your next concrete milestone.";

/// Orchestrates scoring, the summary cache, chat and the proposal workflow.
pub struct CoachService {
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    coach_repository: Arc<dyn CoachRepositoryTrait>,
    proposal_repository: Arc<dyn ProposalRepositoryTrait>,
    ai: Option<Arc<dyn CoachAiTrait>>,
    clock: Arc<dyn Clock>,
    config: CoachConfig,
}

impl CoachService {
    pub fn new(
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        coach_repository: Arc<dyn CoachRepositoryTrait>,
        proposal_repository: Arc<dyn ProposalRepositoryTrait>,
        config: CoachConfig,
    ) -> Self {
        Self {
            goal_repository,
            coach_repository,
            proposal_repository,
            ai: None,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Enables model-written prose. Without it every reply and summary comes
    /// from the rules engine.
    pub fn with_ai(mut self, ai: Arc<dyn CoachAiTrait>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn summary_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(self.config.summary_ttl_hours.max(1))
    }

    fn proposal_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.config.proposal_ttl_minutes.max(1))
    }

    async fn rewrite_or_keep(&self, base: CoachSummary, now: DateTime<Utc>) -> CoachSummary {
        let Some(ai) = &self.ai else {
            return base;
        };
        match ai.rewrite_summary(&base).await {
            Ok(rewrite) => match validate_rewrite(rewrite, &base, now) {
                Ok(summary) => summary,
                Err(e) => {
                    debug!("Discarding rewritten coach summary: {}", e);
                    base
                }
            },
            Err(e) => {
                warn!("Coach summary rewrite failed, keeping rules summary: {}", e);
                base
            }
        }
    }

    async fn compose_reply(
        &self,
        goals: Vec<Goal>,
        latest_summary: Option<CoachSummary>,
        history: Vec<CoachMessage>,
        user_message: &str,
        now: DateTime<Utc>,
        on_token: Option<&OnToken<'_>>,
    ) -> String {
        let fallback_summary = compute_summary(&goals, now);
        if let Some(ai) = &self.ai {
            let context = ChatContext {
                goals,
                latest_summary,
                history,
                user_message: user_message.to_string(),
            };
            let result = match on_token {
                Some(on_token) => ai.chat_reply_stream(&context, on_token).await,
                None => ai.chat_reply(&context).await,
            };
            match result {
                Ok(reply) if !reply.trim().is_empty() => return reply.trim().to_string(),
                Ok(_) => debug!("Coach chat reply was empty, using rules fallback"),
                Err(e) => warn!("Coach chat reply failed, using rules fallback: {}", e),
            }
        }
        let reply = fallback_reply(&fallback_summary);
        emit(on_token, &reply);
        reply
    }

    async fn chat(
        &self,
        user_id: &str,
        input: ChatMessageInput,
        on_token: Option<&OnToken<'_>>,
    ) -> Result<ChatReply> {
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(CoachError::BadRequest("Message is required".to_string()).into());
        }
        if message.chars().count() > MAX_CHAT_MESSAGE_CHARS {
            return Err(CoachError::BadRequest(format!(
                "Message must be at most {} characters",
                MAX_CHAT_MESSAGE_CHARS
            ))
            .into());
        }

        let now = self.clock.now();
        let existing = match input.conversation_id.as_deref() {
            Some(id) => self.coach_repository.get_conversation(user_id, id)?,
            None => None,
        };
        let conversation = match existing {
            Some(conversation) => conversation,
            None => {
                self.coach_repository
                    .create_conversation(user_id, Some(conversation_title(&message)), now)
                    .await?
            }
        };

        let user_message = self
            .coach_repository
            .add_message(user_id, &conversation.id, ChatRole::User, message.clone(), now)
            .await?;

        let goals = self.goal_repository.load_goals_for_coach(user_id)?;
        let latest_summary = self
            .coach_repository
            .get_valid_insight(user_id, now)?
            .map(|insight| insight.summary);
        let history = self
            .coach_repository
            .list_messages(user_id, &conversation.id)?;

        let assistant_turns: Vec<&str> = history
            .iter()
            .filter(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
            .collect();
        let candidates: Vec<GoalCandidate> = goals.iter().map(GoalCandidate::from).collect();
        let intent = parse_intent(&message, &assistant_turns, &candidates, now);
        debug!(
            "Parsed chat intent: {} proposal(s), clarification: {}",
            intent.proposals.len(),
            intent.clarification.is_some()
        );

        let content = match intent.clarification {
            Some(clarification) => {
                emit(on_token, &clarification);
                clarification
            }
            None => {
                let reply = self
                    .compose_reply(goals, latest_summary, history, &message, now, on_token)
                    .await;
                if intent.proposals.is_empty() {
                    reply
                } else {
                    let hint = confirmation_hint(intent.proposals.len());
                    emit(on_token, "\n\n");
                    emit(on_token, hint);
                    format!("{}\n\n{}", reply, hint)
                }
            }
        };

        // Keep the reply strictly after the user message at millisecond precision.
        let replied_at = self.clock.now().max(now + Duration::milliseconds(1));
        let assistant_message = self
            .coach_repository
            .add_assistant_reply(
                user_id,
                &conversation.id,
                content,
                intent.proposals,
                self.proposal_expiry(replied_at),
                replied_at,
            )
            .await?;

        let conversation = self
            .coach_repository
            .get_conversation(user_id, &conversation.id)?
            .unwrap_or(conversation);

        Ok(ChatReply {
            conversation,
            user_message,
            proposed_actions: assistant_message.proposed_actions.clone(),
            assistant_message,
        })
    }
}

fn emit(on_token: Option<&OnToken<'_>>, text: &str) {
    if let Some(on_token) = on_token {
        for token in reply_tokens(text) {
            on_token(token);
        }
    }
}

/// Reply used when no model is configured or the model fails.
pub fn fallback_reply(summary: &CoachSummary) -> String {
    if summary.next_actions.is_empty() {
        return EMPTY_FALLBACK_REPLY.to_string();
    }
    let steps: Vec<String> = summary
        .next_actions
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, a)| format!("{}) {}", i + 1, a.action))
        .collect();
    format!("Focus this week on: {}", steps.join(" "))
}

fn confirmation_hint(count: usize) -> &'static str {
    if count == 1 {
        "I prepared an action for this. Review it below and confirm to apply it."
    } else {
        "I prepared some actions for this. Review them below and confirm the one you want."
    }
}

fn conversation_title(message: &str) -> String {
    message.chars().take(CONVERSATION_TITLE_MAX_CHARS).collect()
}

#[async_trait::async_trait]
impl CoachServiceTrait for CoachService {
    fn get_summary(&self, user_id: &str) -> Result<Option<CoachInsight>> {
        self.coach_repository
            .get_valid_insight(user_id, self.clock.now())
    }

    async fn generate_summary(&self, user_id: &str) -> Result<CoachInsight> {
        let now = self.clock.now();
        let goals = self.goal_repository.load_goals_for_coach(user_id)?;
        let base = compute_summary(&goals, now);
        let summary = self.rewrite_or_keep(base, now).await;
        debug!(
            "Generated coach summary for user {} from {} goals (source: {})",
            user_id,
            goals.len(),
            summary.meta.source.as_str()
        );
        self.coach_repository
            .upsert_insight(
                user_id,
                summary.meta.source,
                summary,
                self.summary_expiry(now),
                now,
            )
            .await
    }

    async fn get_or_generate_summary(&self, user_id: &str) -> Result<CoachInsight> {
        if let Some(insight) = self.get_summary(user_id)? {
            return Ok(insight);
        }
        self.generate_summary(user_id).await
    }

    fn list_conversations(&self, user_id: &str) -> Result<Vec<CoachConversation>> {
        self.coach_repository.list_conversations(user_id)
    }

    fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<CoachMessage>> {
        if self
            .coach_repository
            .get_conversation(user_id, conversation_id)?
            .is_none()
        {
            return Err(CoachError::NotFound("Conversation not found".to_string()).into());
        }
        self.coach_repository.list_messages(user_id, conversation_id)
    }

    async fn send_chat_message(
        &self,
        user_id: &str,
        input: ChatMessageInput,
    ) -> Result<ChatReply> {
        self.chat(user_id, input, None).await
    }

    async fn send_chat_message_stream(
        &self,
        user_id: &str,
        input: ChatMessageInput,
        on_token: &OnToken<'_>,
    ) -> Result<ChatReply> {
        self.chat(user_id, input, Some(on_token)).await
    }

    async fn create_proposals(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        drafts: Vec<ProposalDraft>,
    ) -> Result<Vec<ActionProposal>> {
        let now = self.clock.now();
        self.proposal_repository
            .create_proposals(
                user_id,
                conversation_id,
                message_id,
                drafts,
                self.proposal_expiry(now),
                now,
            )
            .await
    }

    async fn execute_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        confirm_text: Option<String>,
    ) -> Result<ExecuteResult> {
        let now = self.clock.now();
        match self
            .proposal_repository
            .execute_proposal(user_id, proposal_id, confirm_text, now)
            .await?
        {
            ExecuteOutcome::Executed(result) => {
                info!(
                    "Executed action proposal {} ({:?})",
                    proposal_id, result.result_type
                );
                Ok(result)
            }
            ExecuteOutcome::Expired => {
                debug!("Action proposal {} expired before execution", proposal_id);
                Err(CoachError::Conflict("Action proposal expired".to_string()).into())
            }
        }
    }

    async fn undo_proposal(&self, user_id: &str, proposal_id: &str) -> Result<UndoResult> {
        let result = self
            .proposal_repository
            .undo_delete_proposal(user_id, proposal_id, self.clock.now())
            .await?;
        info!("Undid action proposal {}", proposal_id);
        Ok(result)
    }

    async fn complete_action(
        &self,
        user_id: &str,
        goal_id: &str,
        insight_id: &str,
    ) -> Result<()> {
        if self
            .coach_repository
            .get_insight(user_id, insight_id)?
            .is_none()
        {
            return Err(CoachError::NotFound("Coach insight not found".to_string()).into());
        }
        if self.goal_repository.get_goal(user_id, goal_id)?.is_none() {
            return Err(CoachError::NotFound("Goal not found".to_string()).into());
        }
        self.coach_repository
            .create_action_completion(user_id, goal_id, insight_id, self.clock.now())
            .await
    }

    fn completion_rate(&self, user_id: &str, window_days: Option<i64>) -> Result<CompletionRate> {
        let window_days = window_days.unwrap_or(DEFAULT_COMPLETION_WINDOW_DAYS);
        if !(1..=MAX_COMPLETION_WINDOW_DAYS).contains(&window_days) {
            return Err(CoachError::BadRequest(format!(
                "windowDays must be between 1 and {}",
                MAX_COMPLETION_WINDOW_DAYS
            ))
            .into());
        }

        let since = self.clock.now() - Duration::days(window_days);
        let suggested_actions: i64 = self
            .coach_repository
            .list_insight_summaries_since(user_id, since)?
            .iter()
            .map(|s| s.next_actions.len() as i64)
            .sum();
        let completed_actions = self
            .coach_repository
            .count_completions_since(user_id, since)?;
        let rate = if suggested_actions > 0 {
            (completed_actions as f64 / suggested_actions as f64 * 100.0).round() as i64
        } else {
            0
        };

        Ok(CompletionRate {
            window_days,
            suggested_actions,
            completed_actions,
            rate,
        })
    }
}
