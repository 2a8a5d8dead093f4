//! Goal Coach AI - optional language-model prose for the coach.
//!
//! The coach computes every number and structure itself. This crate only
//! rewords rules-generated summaries and drafts chat replies through
//! OpenRouter's chat-completions API; callers validate whatever comes back.
//!
//! # Architecture
//!
//! - `openrouter`: HTTP client implementing `CoachAiTrait`
//! - `prompts`: Prompt builders and completion parsing
//! - `error`: `AiError`, converted into the core error at the trait boundary
//!
//! # Example
//!
//! ```ignore
//! use goalcoach_ai::{OpenRouterClient, OpenRouterConfig};
//!
//! let ai = OpenRouterClient::new(OpenRouterConfig::new(api_key))?;
//! let coach = CoachService::new(goals, coach_repo, proposals, config).with_ai(Arc::new(ai));
//! ```

pub mod error;
pub mod openrouter;
pub mod prompts;

pub use error::AiError;
pub use openrouter::{OpenRouterClient, OpenRouterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompts::{build_chat_prompt, build_rewrite_prompt, parse_rewrite};
