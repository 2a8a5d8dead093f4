//! Goal Coach Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic of the goal coach: the rules-based
//! scoring engine, the chat intent parser, the action-proposal state machine
//! and the services that orchestrate them. It is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod coach;
pub mod constants;
pub mod errors;
pub mod goals;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
