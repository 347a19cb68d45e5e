//! Data models for the bot's store.
//!
//! Row types derive `FromRow` for SQLx queries. String-typed columns that hold
//! an enum (`state`, `action_type`, `last_notified_state`) keep the raw text
//! and expose a parsed accessor, so unknown values from the sync process
//! never fail a query.

pub mod comment;
pub mod merge_request;
pub mod mr_action;
pub mod repository;
pub mod review_state;
pub mod reviewer_config;
pub mod user;

pub use comment::MrComment;
pub use merge_request::{MergeRequest, MergeRequestState, NewMergeRequest};
pub use mr_action::{ActionType, MrAction, NewMrAction};
pub use repository::{ChatSubscription, Repository};
pub use review_state::ReviewState;
pub use reviewer_config::{LabelReviewer, PossibleReviewer, RepositorySla};
pub use user::User;
