//! Long-running server tasks: start, observe over SSE, recover by polling.

pub mod fallback;
pub mod listener;
pub mod runner;
pub mod store;

#[cfg(test)]
mod tests;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::{Endpoint, EvaluateDraftRequest, Evaluation, GenerateRequest, Sections};

pub use listener::{listen, ListenHandle, ListenOutcome, TaskCallbacks};
pub use runner::{TaskRunner, TaskTimeouts};
pub use store::{Delivery, TaskKey, TaskSnapshot, TaskStore};

/// A kind of server task with its endpoints and event name.
pub trait TaskKind: Send + Sync + 'static {
    type Output: DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Request: Serialize + Send + Sync;

    /// Store key namespace.
    const KIND: &'static str;
    /// Terminal success event; failures arrive as `<EVENT>-error`.
    const EVENT: &'static str;

    fn start_endpoint() -> Endpoint;
    fn fallback_endpoint() -> Endpoint;
}

/// AI draft generation; yields the regenerated section list.
pub struct Generation;

impl TaskKind for Generation {
    type Output = Sections;
    type Request = GenerateRequest;

    const KIND: &'static str = "generate";
    const EVENT: &'static str = "completion-generate";

    fn start_endpoint() -> Endpoint {
        Endpoint::Generate
    }

    fn fallback_endpoint() -> Endpoint {
        Endpoint::GenerateFallback
    }
}

pub struct DraftEvaluation;

impl TaskKind for DraftEvaluation {
    type Output = Evaluation;
    type Request = EvaluateDraftRequest;

    const KIND: &'static str = "evaluate";
    const EVENT: &'static str = "completion-evaluate-draft";

    fn start_endpoint() -> Endpoint {
        Endpoint::EvaluateDraft
    }

    fn fallback_endpoint() -> Endpoint {
        Endpoint::EvaluateDraftFallback
    }
}
