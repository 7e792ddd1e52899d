use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{SectionId, UpdateSectionContentRequest};
use crate::core::error::ApiError;
use crate::core::sections::SectionManager;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
struct PendingEdit {
    section_id: SectionId,
    content: String,
}

type PendingEdits = Mutex<Vec<PendingEdit>>;

/// Debounced content persistence for the active section.
///
/// Edits are applied locally right away and saved after a quiet period. A new
/// edit restarts the timer, so only the latest content of each section is
/// written. Switching sections saves every pending edit before the switch, and
/// a failed save keeps the edit pending. Dropping the editor cancels the timer.
pub struct SectionEditor {
    manager: SectionManager,
    debounce: Duration,
    pending: Arc<PendingEdits>,
    flush_lock: Arc<tokio::sync::Mutex<()>>,
    timer: Option<CancellationToken>,
}

impl SectionEditor {
    pub fn new(manager: SectionManager, debounce: Duration) -> Self {
        Self {
            manager,
            debounce,
            pending: Arc::new(Mutex::new(Vec::new())),
            flush_lock: Arc::new(tokio::sync::Mutex::new(())),
            timer: None,
        }
    }

    pub fn manager(&self) -> &SectionManager {
        &self.manager
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| !pending.is_empty())
            .unwrap_or(false)
    }

    pub fn edit(&mut self, section_id: &SectionId, content: &str) {
        self.manager.set_local_content(section_id, content);
        if let Ok(mut pending) = self.pending.lock() {
            let edit = PendingEdit {
                section_id: section_id.clone(),
                content: content.to_string(),
            };
            match pending.iter_mut().find(|queued| &queued.section_id == section_id) {
                Some(existing) => *existing = edit,
                None => pending.push(edit),
            }
        }
        self.restart_timer();
    }

    fn restart_timer(&mut self) {
        self.cancel_timer();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let manager = self.manager.clone();
        let pending = Arc::clone(&self.pending);
        let flush_lock = Arc::clone(&self.flush_lock);
        let delay = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(err) = save_pending(&manager, &pending, &flush_lock).await {
                        warn!(error = %err, "Autosave failed");
                    }
                }
            }
        });
        self.timer = Some(token);
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }

    /// Saves pending edits now, waiting for an autosave already running.
    pub async fn flush(&mut self) -> Result<(), ApiError> {
        self.cancel_timer();
        save_pending(&self.manager, &self.pending, &self.flush_lock).await
    }

    /// Saves unsaved content, then activates `section_id`. The active section
    /// stays put when the save fails.
    pub async fn switch_to(&mut self, section_id: &SectionId) -> Result<bool, ApiError> {
        self.flush().await?;
        Ok(self.manager.click_section(section_id))
    }

    pub async fn close(mut self) -> Result<(), ApiError> {
        self.flush().await
    }
}

impl Drop for SectionEditor {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

async fn save_pending(
    manager: &SectionManager,
    pending: &PendingEdits,
    flush_lock: &tokio::sync::Mutex<()>,
) -> Result<(), ApiError> {
    let _guard = flush_lock.lock().await;
    let edits = pending
        .lock()
        .map(|mut pending| std::mem::take(&mut *pending))
        .unwrap_or_default();

    let mut edits = edits.into_iter();
    while let Some(edit) = edits.next() {
        if edit.content.trim().is_empty() {
            debug!(id = %edit.section_id, "Skipping save of blank section content");
            continue;
        }
        let request = UpdateSectionContentRequest {
            section_id: edit.section_id.clone(),
            content: edit.content.clone(),
        };
        if let Err(err) = manager.update_section_content(request).await {
            restore(pending, std::iter::once(edit).chain(edits));
            return Err(err);
        }
    }
    Ok(())
}

/// Puts unsaved edits back unless a newer edit of the same section arrived.
fn restore(pending: &PendingEdits, unsaved: impl Iterator<Item = PendingEdit>) {
    let Ok(mut pending) = pending.lock() else {
        return;
    };
    let mut kept: Vec<PendingEdit> = unsaved
        .filter(|edit| {
            !pending
                .iter()
                .any(|newer| newer.section_id == edit.section_id)
        })
        .collect();
    kept.append(&mut *pending);
    *pending = kept;
}
