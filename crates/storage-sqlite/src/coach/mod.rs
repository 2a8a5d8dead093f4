//! SQLite storage for coach insights, action completions and conversations.

mod model;
mod repository;

pub use model::{CoachActionCompletionDB, CoachConversationDB, CoachInsightDB, CoachMessageDB};
pub use repository::CoachRepository;
pub(crate) use repository::expire_insight;
