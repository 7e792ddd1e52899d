use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::core::error::ApiError;

/// Identifies the one in-flight task of a kind for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub kind: &'static str,
    pub owner: String,
    pub name: String,
}

impl TaskKey {
    pub fn new(kind: &'static str, owner: &str, name: &str) -> Self {
        Self {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot<T> {
    pub task_id: Option<String>,
    pub result: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> Default for TaskSnapshot<T> {
    fn default() -> Self {
        Self {
            task_id: None,
            result: None,
            error: None,
        }
    }
}

/// Outcome of handing a terminal result to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Applied(T),
    /// Another path got there first; carries the result already stored.
    AlreadyApplied(T),
}

impl<T> Delivery<T> {
    pub fn was_applied(&self) -> bool {
        matches!(self, Delivery::Applied(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Delivery::Applied(value) | Delivery::AlreadyApplied(value) => value,
        }
    }
}

type Entries<T> = HashMap<TaskKey, watch::Sender<TaskSnapshot<T>>>;

/// Typed task-result store shared by an action, its event listener and the
/// fallback path.
///
/// Each key owns a watch channel so observers can subscribe to one task and
/// stop observing by dropping the receiver.
pub struct TaskStore<T> {
    entries: Arc<Mutex<Entries<T>>>,
}

impl<T> Clone for TaskStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for TaskStore<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> TaskStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<R>(&self, key: &TaskKey, f: impl FnOnce(&watch::Sender<TaskSnapshot<T>>) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = entries
            .entry(key.clone())
            .or_insert_with(|| watch::channel(TaskSnapshot::default()).0);
        f(sender)
    }

    pub fn subscribe(&self, key: &TaskKey) -> watch::Receiver<TaskSnapshot<T>> {
        self.with_entry(key, |sender| sender.subscribe())
    }

    pub fn snapshot(&self, key: &TaskKey) -> TaskSnapshot<T> {
        self.with_entry(key, |sender| sender.borrow().clone())
    }

    pub fn task_id(&self, key: &TaskKey) -> Option<String> {
        self.with_entry(key, |sender| sender.borrow().task_id.clone())
    }

    pub fn result(&self, key: &TaskKey) -> Option<T> {
        self.with_entry(key, |sender| sender.borrow().result.clone())
    }

    pub fn error(&self, key: &TaskKey) -> Option<ApiError> {
        self.with_entry(key, |sender| sender.borrow().error.clone())
    }

    pub fn set_task_id(&self, key: &TaskKey, task_id: &str) {
        debug!(task = %key, task_id, "Task id recorded");
        self.with_entry(key, |sender| {
            sender.send_modify(|snapshot| snapshot.task_id = Some(task_id.to_string()));
        });
    }

    /// Removes and returns the task id so it can only be polled once.
    pub fn take_task_id(&self, key: &TaskKey) -> Option<String> {
        self.with_entry(key, |sender| {
            let mut taken = None;
            sender.send_if_modified(|snapshot| {
                taken = snapshot.task_id.take();
                taken.is_some()
            });
            taken
        })
    }

    /// Stores `result` unless a result is already present for `key`.
    pub fn apply_result(&self, key: &TaskKey, result: T) -> Delivery<T> {
        self.with_entry(key, |sender| {
            let mut delivery = None;
            sender.send_if_modified(|snapshot| match &snapshot.result {
                Some(existing) => {
                    delivery = Some(Delivery::AlreadyApplied(existing.clone()));
                    false
                }
                None => {
                    snapshot.result = Some(result.clone());
                    snapshot.error = None;
                    delivery = Some(Delivery::Applied(result.clone()));
                    true
                }
            });
            delivery.unwrap_or(Delivery::Applied(result))
        })
    }

    pub fn set_error(&self, key: &TaskKey, error: ApiError) {
        self.with_entry(key, |sender| {
            sender.send_modify(|snapshot| snapshot.error = Some(error));
        });
    }

    /// Drops everything recorded for `key`; required before a new task of the
    /// same key starts.
    pub fn evict(&self, key: &TaskKey) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = entries.get(key) {
            if sender.receiver_count() == 0 {
                entries.remove(key);
            } else {
                sender.send_replace(TaskSnapshot::default());
            }
        }
    }

    /// Teardown after a task settles: the task id and error go, the result
    /// stays visible to observers. With no observer left the entry is dropped.
    pub fn clear_task(&self, key: &TaskKey) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = entries.get(key) else {
            return;
        };
        if sender.receiver_count() == 0 {
            entries.remove(key);
            return;
        }
        sender.send_if_modified(|snapshot| {
            let changed = snapshot.task_id.is_some() || snapshot.error.is_some();
            snapshot.task_id = None;
            snapshot.error = None;
            changed
        });
    }
}
