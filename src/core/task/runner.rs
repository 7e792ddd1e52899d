use std::marker::PhantomData;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::error::{codes, ApiError};
use crate::core::http::{ApiClient, HttpRequest};
use crate::core::task::listener::{listen, ListenOutcome, TaskCallbacks};
use crate::core::task::store::{TaskKey, TaskStore};
use crate::core::task::{fallback, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTimeouts {
    /// How long to wait for the `connected` event that carries the task id.
    pub connect: Duration,
    /// How long to wait for the terminal event once the task started.
    pub task: Duration,
}

impl Default for TaskTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            task: Duration::from_secs(300),
        }
    }
}

/// Runs one task kind end to end: evict stale state, subscribe, start the
/// job, then take whichever of the event or the fallback delivers first.
pub struct TaskRunner<K: TaskKind> {
    client: ApiClient,
    store: TaskStore<K::Output>,
    timeouts: TaskTimeouts,
    _kind: PhantomData<K>,
}

impl<K: TaskKind> Clone for TaskRunner<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            timeouts: self.timeouts,
            _kind: PhantomData,
        }
    }
}

impl<K: TaskKind> TaskRunner<K> {
    pub fn new(client: ApiClient, timeouts: TaskTimeouts) -> Self {
        Self {
            client,
            store: TaskStore::new(),
            timeouts,
            _kind: PhantomData,
        }
    }

    pub fn store(&self) -> &TaskStore<K::Output> {
        &self.store
    }

    pub fn key(&self, owner: &str, name: &str) -> TaskKey {
        TaskKey::new(K::KIND, owner, name)
    }

    /// Drops every entry recorded for the repository's task.
    pub fn discard(&self, owner: &str, name: &str) {
        self.store.evict(&self.key(owner, name));
    }

    pub async fn run(
        &self,
        owner: &str,
        name: &str,
        request: &K::Request,
    ) -> Result<K::Output, ApiError> {
        let key = self.key(owner, name);
        self.store.evict(&key);
        let outcome = self.drive(&key, owner, name, request).await;
        self.store.clear_task(&key);
        outcome
    }

    async fn drive(
        &self,
        key: &TaskKey,
        owner: &str,
        name: &str,
        request: &K::Request,
    ) -> Result<K::Output, ApiError> {
        let mut updates = self.store.subscribe(key);
        let mut handle = listen(
            &self.client,
            self.store.clone(),
            key.clone(),
            K::EVENT,
            TaskCallbacks::new(),
        );

        tokio::select! {
            _ = updates.wait_for(|snapshot| snapshot.task_id.is_some()) => {}
            _ = handle.finished() => {}
            _ = tokio::time::sleep(self.timeouts.connect) => {}
        }
        drop(updates);

        let Some(task_id) = self.store.task_id(key) else {
            warn!(task = %key, "Task stream never reported a task id");
            return Err(ApiError::client(
                codes::TASK_NOT_STARTED,
                "The task could not be started. Please try again.",
            ));
        };

        let body = serde_json::to_value(request).map_err(|err| {
            ApiError::client(
                codes::INVALID_REQUEST,
                format!("Request body could not be encoded: {err}"),
            )
        })?;
        let start = HttpRequest::new(Method::POST, K::start_endpoint().with(&[owner, name]))
            .query("taskId", &task_id)
            .body(body);

        info!(task = %key, task_id = %task_id, "Starting task");
        if let Err(err) = self.client.request::<Option<Value>>(start).await {
            warn!(task = %key, error = %err, "Task start failed; trying fallback");
            handle.close();
            return fallback::recover::<K>(&self.client, &self.store, key)
                .await
                .map_err(|_| err);
        }

        let outcome = tokio::time::timeout(self.timeouts.task, handle.finished())
            .await
            .unwrap_or_else(|_| {
                info!(task = %key, "Timed out waiting for task event");
                ListenOutcome::Dropped
            });
        handle.close();

        match outcome {
            ListenOutcome::Succeeded => match self.store.result(key) {
                Some(result) => Ok(result),
                None => fallback::recover::<K>(&self.client, &self.store, key).await,
            },
            ListenOutcome::Failed => {
                let reported = self.store.error(key);
                debug!(task = %key, "Task event reported failure; trying fallback");
                fallback::recover::<K>(&self.client, &self.store, key)
                    .await
                    .map_err(|err| reported.unwrap_or(err))
            }
            ListenOutcome::Dropped | ListenOutcome::Cancelled => {
                fallback::recover::<K>(&self.client, &self.store, key).await
            }
        }
    }
}
