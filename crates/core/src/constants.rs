/// Milliseconds in one day.
pub const MS_IN_DAY: i64 = 1000 * 60 * 60 * 24;

/// Rolling window (days) used for velocity and reported in summary metadata.
pub const DATA_WINDOW_DAYS: i64 = 14;

/// Version tag stamped on every rules-generated summary.
pub const ENGINE_VERSION: &str = "rules-v1.1";

/// Sentinel goal id used by the "no active goals" summary.
pub const EMPTY_GOAL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Default proposal lifetime in minutes.
pub const DEFAULT_PROPOSAL_TTL_MINUTES: i64 = 15;

/// Undo window for executed delete proposals, in seconds.
pub const UNDO_WINDOW_SECONDS: i64 = 30;

/// Default summary cache lifetime in hours.
pub const DEFAULT_SUMMARY_TTL_HOURS: i64 = 24;

/// Literal the user must type to confirm a delete proposal.
pub const DELETE_CONFIRM_TEXT: &str = "DELETE";

/// Number of progress events included in a goal snapshot for the coach.
pub const COACH_PROGRESS_EVENTS_LIMIT: i64 = 5;

/// Max length of a chat message.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

/// Conversation titles are the first user message cut to this many chars.
pub const CONVERSATION_TITLE_MAX_CHARS: usize = 60;

/// Fallback title for conversations without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Number of trailing assistant turns the intent parser inspects for markers.
pub const INTENT_ASSISTANT_TURNS: usize = 3;

/// Max candidate titles listed in a clarification message.
pub const MAX_CLARIFICATION_CANDIDATES: usize = 5;

/// Default and max window for the action completion rate.
pub const DEFAULT_COMPLETION_WINDOW_DAYS: i64 = 7;
pub const MAX_COMPLETION_WINDOW_DAYS: i64 = 30;
