//! User-triggered operations that combine a server task with section state.

pub mod evaluate;
pub mod generate;
pub mod pull_request;


pub use evaluate::{CachedEvaluation, EvaluateAction, EvaluationCache};
pub use generate::GenerateAction;
pub use pull_request::PullRequestAction;
