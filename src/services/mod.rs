//! Business logic services.
//!
//! Remote clients sit behind the traits in [`remote`]; everything else reads
//! and writes the store through [`crate::db`] and is testable with the
//! clients swapped for doubles.

pub mod assignment;
pub mod candidate_pool;
pub mod chat_client;
pub mod gitlab_client;
pub mod messages;
pub mod notification;
pub mod remote;
pub mod review_state;
pub mod reviewer_selection;
pub mod rng;
pub mod scheduler;
pub mod selector;

pub use assignment::{AssignmentEngine, AssignmentReport};
pub use chat_client::{ChatClient, ChatClientConfig};
pub use gitlab_client::{GitLabClient, GitLabClientConfig};
pub use notification::{NotificationEngine, NotificationReport};
pub use remote::{ChatService, CodeReviewService, RemoteMergeRequest};
pub use reviewer_selection::{ReviewerSelector, Selection};
pub use rng::SharedRng;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use selector::WeightedSelector;
