//! Coach module - scoring engine, intent parser, action proposals and the
//! service tying them to storage.

mod coach_errors;
mod coach_model;
mod coach_service;
mod coach_traits;
pub mod intent;
mod proposal_model;
pub mod scoring;
pub mod summary_validation;


pub use coach_errors::CoachError;
pub use coach_model::{
    ActionItem, Band, ChatContext, ChatMessageInput, ChatReply, ChatRole, CoachConfig,
    CoachConversation, CoachInsight, CoachMessage, CoachSummary, CompletionRate, Confidence,
    PriorityItem, RiskCategory, RiskItem, SummaryMeta, SummaryRewrite, SummarySource,
};
pub use coach_service::{fallback_reply, CoachService};
pub use coach_traits::{
    reply_tokens, Clock, CoachAiTrait, CoachRepositoryTrait, CoachServiceTrait, OnToken,
    ProposalRepositoryTrait, SystemClock,
};
pub use intent::{parse_intent, GoalCandidate, IntentParseResult, DELETE_MARKER, UPDATE_MARKER};
pub use proposal_model::{
    ActionProposal, CreateGoalPayload, DeleteGoalPayload, ExecuteOutcome,
    ExecuteProposalInput, ExecuteResult, ExecuteResultType, ProposalDraft, ProposalStatus,
    ProposedAction, RiskLevel, UndoResult, UpdateGoalPayload,
};
pub use scoring::compute_summary;
