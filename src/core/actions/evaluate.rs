use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::{EvaluateDraftRequest, Evaluation};
use crate::core::error::ApiError;
use crate::core::http::ApiClient;
use crate::core::notice::Notifier;
use crate::core::sections::SectionManager;
use crate::core::task::{DraftEvaluation, TaskRunner, TaskTimeouts};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedEvaluation {
    pub evaluation: Evaluation,
    pub evaluated_at: DateTime<Utc>,
}

/// Latest evaluation per repository.
#[derive(Clone, Default)]
pub struct EvaluationCache {
    entries: Arc<Mutex<HashMap<(String, String), CachedEvaluation>>>,
}

impl EvaluationCache {
    pub fn get(&self, owner: &str, name: &str) -> Option<CachedEvaluation> {
        self.entries
            .lock()
            .ok()?
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
    }

    pub fn insert(&self, owner: &str, name: &str, evaluation: Evaluation) -> CachedEvaluation {
        let cached = CachedEvaluation {
            evaluation,
            evaluated_at: Utc::now(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert((owner.to_string(), name.to_string()), cached.clone());
        }
        cached
    }

    pub fn remove(&self, owner: &str, name: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&(owner.to_string(), name.to_string()));
        }
    }
}

/// Asks the server to grade the current draft.
pub struct EvaluateAction {
    runner: TaskRunner<DraftEvaluation>,
    sections: SectionManager,
    cache: EvaluationCache,
    notices: Notifier,
}

impl EvaluateAction {
    pub fn new(
        client: ApiClient,
        sections: SectionManager,
        cache: EvaluationCache,
        timeouts: TaskTimeouts,
        notices: Notifier,
    ) -> Self {
        Self {
            runner: TaskRunner::new(client, timeouts),
            sections,
            cache,
            notices,
        }
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub async fn run(&self, branch: &str) -> Result<CachedEvaluation, ApiError> {
        let owner = self.sections.owner();
        let name = self.sections.name();
        let request = EvaluateDraftRequest {
            branch: branch.to_string(),
            content: self.sections.full_content(),
        };

        match self.runner.run(owner, name, &request).await {
            Ok(evaluation) => {
                info!(status = ?evaluation.status, rating = ?evaluation.rating, "Draft evaluated");
                if !evaluation.has_result() {
                    self.notices.info("The evaluation has no result yet.");
                } else {
                    self.notices.success("README evaluation finished.");
                }
                Ok(self.cache.insert(owner, name, evaluation))
            }
            Err(err) => {
                self.notices.error("Failed to evaluate the README.");
                Err(err)
            }
        }
    }
}

impl Drop for EvaluateAction {
    fn drop(&mut self) {
        self.runner
            .discard(self.sections.owner(), self.sections.name());
    }
}
