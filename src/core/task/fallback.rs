use tracing::{info, warn};

use crate::core::error::ApiError;
use crate::core::http::ApiClient;
use crate::core::task::store::{TaskKey, TaskStore};
use crate::core::task::TaskKind;

/// Polls the task-scoped fallback endpoint once.
pub async fn fetch<K: TaskKind>(client: &ApiClient, task_id: &str) -> Result<K::Output, ApiError> {
    let path = K::fallback_endpoint().with(&[task_id]);
    info!(kind = K::KIND, task_id, "Fetching task result through fallback");
    client.get::<K::Output>(&path).await
}

/// Recovers the result of the task recorded under `key`.
///
/// The cached task id is consumed, so a task is polled at most once. Without
/// a task id there is nothing to poll and the call fails without touching the
/// network. A fetched result goes through the same store update as an event
/// delivery; if the event won the race, its result is returned instead.
pub async fn recover<K: TaskKind>(
    client: &ApiClient,
    store: &TaskStore<K::Output>,
    key: &TaskKey,
) -> Result<K::Output, ApiError> {
    let Some(task_id) = store.take_task_id(key) else {
        warn!(task = %key, "No task id recorded; fallback unavailable");
        return Err(ApiError::task_id_missing());
    };

    match fetch::<K>(client, &task_id).await {
        Ok(result) => Ok(store.apply_result(key, result).into_inner()),
        Err(err) => {
            warn!(task = %key, task_id = %task_id, error = %err, "Fallback fetch failed");
            store.set_error(key, err.clone());
            Err(err)
        }
    }
}
