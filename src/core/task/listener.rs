//! Task event listener over the shared `/sse/subscribe` stream.
//!
//! One stream per `listen` call. `connected` records the task id, the named
//! event delivers the result and `<name>-error` the failure; either terminal
//! event closes the stream. A stream that drops early is not reopened: the
//! task stays pending until the caller runs fallback recovery.

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ConnectedEvent, Endpoint};
use crate::core::error::ApiError;
use crate::core::http::ApiClient;
use crate::core::sse::{SseDecoder, SseEvent};
use crate::core::task::store::{TaskKey, TaskStore};

pub const CONNECTED_EVENT: &str = "connected";

type SuccessCallback<T> = Box<dyn FnOnce(T) + Send>;
type ErrorCallback = Box<dyn FnOnce(ApiError) + Send>;

pub struct TaskCallbacks<T> {
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Default for TaskCallbacks<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> TaskCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, callback: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(ApiError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    Succeeded,
    Failed,
    /// The stream ended or could not be opened before a terminal event.
    Dropped,
    Cancelled,
}

/// Owns a running listener; dropping it closes the stream.
pub struct ListenHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<ListenOutcome>>,
    outcome: Option<ListenOutcome>,
}

impl ListenHandle {
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Waits for the listener to stop. Safe to call again after it returned.
    pub async fn finished(&mut self) -> ListenOutcome {
        if let Some(task) = self.task.as_mut() {
            let outcome = task.await.unwrap_or(ListenOutcome::Cancelled);
            self.task = None;
            self.outcome = Some(outcome);
        }
        self.outcome.unwrap_or(ListenOutcome::Cancelled)
    }
}

impl Drop for ListenHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub fn listen<T>(
    client: &ApiClient,
    store: TaskStore<T>,
    key: TaskKey,
    event_name: &str,
    callbacks: TaskCallbacks<T>,
) -> ListenHandle
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let cancel = CancellationToken::new();
    let listener = Listener {
        store,
        key,
        event_name: event_name.to_string(),
        error_event: format!("{event_name}-error"),
        callbacks,
    };
    let task = tokio::spawn(listener.run(client.clone(), cancel.clone()));

    ListenHandle {
        cancel,
        task: Some(task),
        outcome: None,
    }
}

struct Listener<T> {
    store: TaskStore<T>,
    key: TaskKey,
    event_name: String,
    error_event: String,
    callbacks: TaskCallbacks<T>,
}

impl<T> Listener<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn run(mut self, client: ApiClient, cancel: CancellationToken) -> ListenOutcome {
        let path = Endpoint::SseSubscribe.path();
        let opened = tokio::select! {
            _ = cancel.cancelled() => return ListenOutcome::Cancelled,
            opened = client.open_event_stream(&path) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!(task = %self.key, error = %err, "Could not open task event stream");
                return ListenOutcome::Dropped;
            }
        };
        debug!(task = %self.key, event = %self.event_name, "Task event stream open");

        let mut decoder = SseDecoder::default();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(task = %self.key, "Task event stream closed by owner");
                    return ListenOutcome::Cancelled;
                }
                chunk = stream.next() => chunk,
            };

            let (events, ended) = match chunk {
                Some(Ok(bytes)) => (decoder.push(&bytes), false),
                Some(Err(err)) => {
                    debug!(task = %self.key, error = %err, "Task event stream failed");
                    (decoder.finish(), true)
                }
                None => (decoder.finish(), true),
            };

            for event in events {
                if let Some(outcome) = self.handle(event) {
                    return outcome;
                }
            }

            if ended {
                info!(task = %self.key, "Task event stream dropped before a terminal event");
                return ListenOutcome::Dropped;
            }
        }
    }

    fn handle(&mut self, event: SseEvent) -> Option<ListenOutcome> {
        if event.event == CONNECTED_EVENT {
            match serde_json::from_str::<ConnectedEvent>(&event.data) {
                Ok(ConnectedEvent {
                    task_id: Some(task_id),
                }) => self.store.set_task_id(&self.key, &task_id),
                Ok(_) => debug!(task = %self.key, "Connected event without task id"),
                Err(err) => debug!(task = %self.key, error = %err, "Ignoring malformed connected event"),
            }
            return None;
        }

        if event.event == self.event_name {
            return Some(match serde_json::from_str::<T>(&event.data) {
                Ok(value) => {
                    let delivered = self.store.apply_result(&self.key, value);
                    if !delivered.was_applied() {
                        debug!(task = %self.key, "Result already applied by fallback");
                    }
                    if let Some(callback) = self.callbacks.on_success.take() {
                        callback(delivered.into_inner());
                    }
                    ListenOutcome::Succeeded
                }
                Err(err) => self.fail(ApiError::decode(err)),
            });
        }

        if event.event == self.error_event {
            return Some(self.fail(ApiError::from_event_payload(&event.data)));
        }

        None
    }

    fn fail(&mut self, error: ApiError) -> ListenOutcome {
        warn!(task = %self.key, error = %error, "Task reported failure");
        self.store.set_error(&self.key, error.clone());
        if let Some(callback) = self.callbacks.on_error.take() {
            callback(error);
        }
        ListenOutcome::Failed
    }
}
