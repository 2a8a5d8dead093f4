use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::coach_model::{
    ChatContext, ChatMessageInput, ChatReply, ChatRole, CoachConversation, CoachInsight,
    CoachMessage, CoachSummary, CompletionRate, SummaryRewrite, SummarySource,
};
use super::proposal_model::{
    ActionProposal, ExecuteOutcome, ExecuteResult, ProposalDraft, UndoResult,
};
use crate::errors::Result;

/// Source of the current time. Services read it once per operation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persistence for cached insights, action completions and conversations.
#[async_trait]
pub trait CoachRepositoryTrait: Send + Sync {
    /// The user's cached insight if it has not expired at `now`.
    fn get_valid_insight(&self, user_id: &str, now: DateTime<Utc>)
        -> Result<Option<CoachInsight>>;
    fn get_insight(&self, user_id: &str, insight_id: &str) -> Result<Option<CoachInsight>>;
    /// Replaces the user's cached insight wholesale.
    async fn upsert_insight(
        &self,
        user_id: &str,
        source: SummarySource,
        summary: CoachSummary,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CoachInsight>;
    /// Summaries of insights created at or after `since`.
    fn list_insight_summaries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CoachSummary>>;

    async fn create_action_completion(
        &self,
        user_id: &str,
        goal_id: &str,
        insight_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;
    fn count_completions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<i64>;

    fn list_conversations(&self, user_id: &str) -> Result<Vec<CoachConversation>>;
    fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<CoachConversation>>;
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CoachConversation>;
    /// Messages in creation order with their proposals attached.
    fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<CoachMessage>>;
    /// Appends a message and bumps the conversation. User messages also
    /// refresh the conversation title.
    async fn add_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: ChatRole,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<CoachMessage>;
    /// Appends an assistant message together with its proposals in one
    /// transaction.
    async fn add_assistant_reply(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: String,
        drafts: Vec<ProposalDraft>,
        proposal_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CoachMessage>;
}

/// Persistence and state transitions of action proposals.
///
/// `execute_proposal` and `undo_delete_proposal` each run as a single
/// transaction: guard, goal mutation and cache invalidation commit together.
#[async_trait]
pub trait ProposalRepositoryTrait: Send + Sync {
    fn get_proposal(&self, user_id: &str, proposal_id: &str) -> Result<Option<ActionProposal>>;
    async fn create_proposals(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        drafts: Vec<ProposalDraft>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActionProposal>>;
    async fn execute_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        confirm_text: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ExecuteOutcome>;
    async fn undo_delete_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UndoResult>;
}

/// Receives reply text as it is produced. Concatenated tokens equal the reply.
pub type OnToken<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Splits text into word tokens that keep their trailing whitespace.
pub fn reply_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(char::is_whitespace)
}

/// Optional language model used for prose only.
#[async_trait]
pub trait CoachAiTrait: Send + Sync {
    /// Rewrites the text fields of a summary. The result is untrusted.
    async fn rewrite_summary(&self, summary: &CoachSummary) -> Result<SummaryRewrite>;
    async fn chat_reply(&self, context: &ChatContext) -> Result<String>;

    /// Streams a chat reply. Models without a streaming transport replay the
    /// full reply as word tokens.
    async fn chat_reply_stream(
        &self,
        context: &ChatContext,
        on_token: &OnToken<'_>,
    ) -> Result<String> {
        let reply = self.chat_reply(context).await?;
        for token in reply_tokens(&reply) {
            on_token(token);
        }
        Ok(reply)
    }
}

#[async_trait]
pub trait CoachServiceTrait: Send + Sync {
    fn get_summary(&self, user_id: &str) -> Result<Option<CoachInsight>>;
    async fn generate_summary(&self, user_id: &str) -> Result<CoachInsight>;
    async fn get_or_generate_summary(&self, user_id: &str) -> Result<CoachInsight>;

    fn list_conversations(&self, user_id: &str) -> Result<Vec<CoachConversation>>;
    fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<CoachMessage>>;
    async fn send_chat_message(&self, user_id: &str, input: ChatMessageInput)
        -> Result<ChatReply>;
    /// Same as `send_chat_message`, also emitting the assistant reply token by
    /// token before it is persisted.
    async fn send_chat_message_stream(
        &self,
        user_id: &str,
        input: ChatMessageInput,
        on_token: &OnToken<'_>,
    ) -> Result<ChatReply>;

    async fn create_proposals(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        drafts: Vec<ProposalDraft>,
    ) -> Result<Vec<ActionProposal>>;
    async fn execute_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        confirm_text: Option<String>,
    ) -> Result<ExecuteResult>;
    async fn undo_proposal(&self, user_id: &str, proposal_id: &str) -> Result<UndoResult>;

    async fn complete_action(&self, user_id: &str, goal_id: &str, insight_id: &str)
        -> Result<()>;
    fn completion_rate(&self, user_id: &str, window_days: Option<i64>) -> Result<CompletionRate>;
}
