//! SQLite storage for coach action proposals and their executor.

mod model;
mod repository;

pub use model::ActionProposalDB;
pub use repository::ProposalRepository;
pub(crate) use repository::{insert_proposals, load_proposals_by_message};
