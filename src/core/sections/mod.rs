//! Ordered README sections for one repository.
//!
//! The manager holds the local copy and persists each mutation through the
//! API. Reorders are applied optimistically and reverted when persistence
//! fails. Content edits are local first and kept when a save fails, so the
//! editor can retry them. Other mutations touch local state only after the
//! server agreed.
//! At least one section always remains, and the active section always
//! points at a section that exists.

pub mod editor;


use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{
    CreateSectionRequest, DeleteSectionRequest, Endpoint, InitSectionRequest,
    ReorderSectionRequest, Section, SectionId, Sections, UpdateSectionContentRequest,
};
use crate::core::error::{codes, ApiError};
use crate::core::http::{ApiClient, HttpRequest};
use crate::core::notice::Notifier;

pub use editor::SectionEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The repository has no sections yet; initialization is required.
    NeedsInit,
}

/// State of the branch + split-mode initialization form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitPrompt {
    #[default]
    Closed,
    /// Opened because no sections exist; cannot be dismissed.
    Required,
    /// Opened by an explicit reset.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionView {
    pub sections: Vec<Section>,
    pub active: Option<SectionId>,
    pub prompt: InitPrompt,
}

struct Shared {
    client: ApiClient,
    owner: String,
    name: String,
    state: Mutex<SectionView>,
    updates: watch::Sender<SectionView>,
    notices: Notifier,
    deletes: tokio::sync::Mutex<()>,
}

#[derive(Clone)]
pub struct SectionManager {
    shared: Arc<Shared>,
}

fn renumber(sections: &mut [Section]) {
    for (index, section) in sections.iter_mut().enumerate() {
        section.order_idx = index as u32 + 1;
    }
}

fn repair_active(view: &mut SectionView) {
    let present = view
        .active
        .as_ref()
        .is_some_and(|active| view.sections.iter().any(|section| &section.id == active));
    if !present {
        view.active = view.sections.first().map(|section| section.id.clone());
    }
}

impl SectionManager {
    pub fn new(client: ApiClient, owner: &str, name: &str, notices: Notifier) -> Self {
        let (updates, _rx) = watch::channel(SectionView::default());
        Self {
            shared: Arc::new(Shared {
                client,
                owner: owner.to_string(),
                name: name.to_string(),
                state: Mutex::new(SectionView::default()),
                updates,
                notices,
                deletes: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn owner(&self) -> &str {
        &self.shared.owner
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn subscribe(&self) -> watch::Receiver<SectionView> {
        self.shared.updates.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, SectionView> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `change` and publishes the result to subscribers.
    fn mutate<R>(&self, change: impl FnOnce(&mut SectionView) -> R) -> R {
        let mut state = self.state();
        let result = change(&mut state);
        repair_active(&mut state);
        self.shared.updates.send_replace(state.clone());
        result
    }

    fn endpoint(&self, endpoint: Endpoint) -> String {
        endpoint.with(&[&self.shared.owner, &self.shared.name])
    }

    pub fn view(&self) -> SectionView {
        self.state().clone()
    }

    pub fn sections(&self) -> Vec<Section> {
        self.state().sections.clone()
    }

    pub fn active_section(&self) -> Option<Section> {
        let state = self.state();
        let active = state.active.as_ref()?;
        state
            .sections
            .iter()
            .find(|section| &section.id == active)
            .cloned()
    }

    pub fn prompt(&self) -> InitPrompt {
        self.state().prompt
    }

    /// All section contents joined by a blank line.
    pub fn full_content(&self) -> String {
        self.state()
            .sections
            .iter()
            .map(|section| section.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fetches the section list.
    ///
    /// A missing section list opens the required init prompt. A 401 is left
    /// to the session layer; any other failure is fatal to the view and
    /// raises a notice.
    pub async fn load(&self) -> Result<LoadOutcome, ApiError> {
        match self
            .shared
            .client
            .get::<Sections>(&self.endpoint(Endpoint::Sections))
            .await
        {
            Ok(Sections { sections }) => {
                debug!(count = sections.len(), "Sections loaded");
                self.replace_all(sections);
                Ok(LoadOutcome::Loaded)
            }
            Err(err) if err.is_not_found_sections() => {
                info!(owner = %self.shared.owner, name = %self.shared.name, "No sections yet");
                self.mutate(|view| {
                    view.sections.clear();
                    view.prompt = InitPrompt::Required;
                });
                Ok(LoadOutcome::NeedsInit)
            }
            Err(err) if err.is_unauthorized() => Err(err),
            Err(err) => {
                warn!(error = %err, "Section list could not be loaded");
                self.shared.notices.error("Invalid access to this repository.");
                Err(err)
            }
        }
    }

    /// Replaces the whole collection, keeping the active section if it is
    /// still present. Closes the init prompt.
    pub fn replace_all(&self, mut sections: Vec<Section>) {
        sections.sort_by_key(|section| section.order_idx);
        self.mutate(|view| {
            view.sections = sections;
            view.prompt = InitPrompt::Closed;
        });
    }

    pub fn click_section(&self, id: &SectionId) -> bool {
        self.mutate(|view| {
            if view.sections.iter().any(|section| &section.id == id) {
                view.active = Some(id.clone());
                true
            } else {
                false
            }
        })
    }

    /// Local-only content change; the editor persists it later.
    pub(crate) fn set_local_content(&self, id: &SectionId, content: &str) {
        self.mutate(|view| {
            if let Some(section) = view.sections.iter_mut().find(|section| &section.id == id) {
                section.content = content.to_string();
            }
        });
    }

    pub async fn create_section(&self, request: CreateSectionRequest) -> Result<Section, ApiError> {
        if request.title.trim().is_empty() {
            self.shared.notices.error("Enter a section title.");
            return Err(ApiError::client(
                codes::INVALID_REQUEST,
                "Section title must not be empty.",
            ));
        }

        match self
            .shared
            .client
            .post::<Section, _>(&self.endpoint(Endpoint::Sections), &request)
            .await
        {
            Ok(section) => {
                info!(id = %section.id, title = %section.title, "Section created");
                self.mutate(|view| view.sections.push(section.clone()));
                Ok(section)
            }
            Err(err) => {
                warn!(error = %err, "Section creation failed");
                self.shared.notices.error("Failed to add the section.");
                Err(err)
            }
        }
    }

    /// Builds the reorder request for moving the section at `from` to `to`.
    pub fn move_section(&self, from: usize, to: usize) -> Option<ReorderSectionRequest> {
        let state = self.state();
        if from >= state.sections.len() || to >= state.sections.len() {
            return None;
        }
        let mut ids: Vec<SectionId> = state.sections.iter().map(|section| section.id.clone()).collect();
        let moved = ids.remove(from);
        ids.insert(to, moved);
        Some(ReorderSectionRequest { section_ids: ids })
    }

    /// Applies the new order immediately and persists it; the previous order
    /// comes back if the server rejects it.
    pub async fn update_section_reorder(
        &self,
        request: ReorderSectionRequest,
    ) -> Result<(), ApiError> {
        let previous = self.mutate(|view| {
            let mut remaining = view.sections.clone();
            let mut reordered = Vec::with_capacity(remaining.len());
            for id in &request.section_ids {
                let position = remaining.iter().position(|section| &section.id == id)?;
                reordered.push(remaining.remove(position));
            }
            if !remaining.is_empty() {
                return None;
            }
            renumber(&mut reordered);
            Some(std::mem::replace(&mut view.sections, reordered))
        });
        let Some(previous) = previous else {
            return Err(ApiError::client(
                codes::INVALID_REQUEST,
                "Reorder must list every section exactly once.",
            ));
        };

        match self
            .shared
            .client
            .put::<Option<Value>, _>(&self.endpoint(Endpoint::SectionsReorder), &request)
            .await
        {
            Ok(_) => {
                debug!(count = request.section_ids.len(), "Section order saved");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Section reorder failed; restoring previous order");
                self.mutate(|view| view.sections = previous);
                self.shared.notices.error("Failed to change the section order.");
                Err(err)
            }
        }
    }

    /// Applies the content locally, then persists it. A save that completes
    /// late never overwrites newer local content.
    pub async fn update_section_content(
        &self,
        request: UpdateSectionContentRequest,
    ) -> Result<(), ApiError> {
        self.set_local_content(&request.section_id, &request.content);
        self.shared
            .client
            .patch::<Option<Value>, _>(&self.endpoint(Endpoint::SectionsContent), &request)
            .await
            .map_err(|err| {
                warn!(id = %request.section_id, error = %err, "Section content not saved");
                self.shared.notices.error("Failed to save the section.");
                err
            })?;
        debug!(id = %request.section_id, "Section content saved");
        Ok(())
    }

    /// Deletes a section; refused while it is the last one. Deletes run one
    /// at a time so the count check holds until the server answers.
    pub async fn delete_section(&self, request: DeleteSectionRequest) -> Result<(), ApiError> {
        let _serialized = self.shared.deletes.lock().await;
        if self.state().sections.len() <= 1 {
            self.shared
                .notices
                .error("At least one section must remain.");
            return Err(ApiError::client(
                codes::LAST_SECTION,
                "At least one section must remain.",
            ));
        }

        let id = request.section_id.to_string();
        let path = Endpoint::SectionsDelete.with(&[&self.shared.owner, &self.shared.name, &id]);
        match self.shared.client.delete::<Option<Value>>(&path).await {
            Ok(_) => {
                info!(id = %request.section_id, "Section deleted");
                self.mutate(|view| {
                    view.sections.retain(|section| section.id != request.section_id);
                    renumber(&mut view.sections);
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Section deletion failed");
                self.shared.notices.error("Failed to delete the section.");
                Err(err)
            }
        }
    }

    /// Replaces every section with a fresh split of the branch README.
    pub async fn init_sections(&self, request: InitSectionRequest) -> Result<Sections, ApiError> {
        let call = HttpRequest::new(Method::PUT, self.endpoint(Endpoint::SectionsInit))
            .query("branch", &request.branch)
            .query("splitMode", request.split_mode.as_str());

        match self.shared.client.request::<Sections>(call).await {
            Ok(sections) => {
                info!(branch = %request.branch, count = sections.sections.len(), "Sections initialized");
                self.replace_all(sections.sections.clone());
                self.mutate(|view| {
                    view.active = view.sections.first().map(|section| section.id.clone());
                });
                Ok(sections)
            }
            Err(err) => {
                warn!(error = %err, "Section initialization failed");
                self.shared.notices.error("Failed to initialize the sections.");
                Err(err)
            }
        }
    }

    /// Opens the init prompt for an explicit reset.
    pub fn reset_section(&self) {
        self.mutate(|view| {
            if view.prompt == InitPrompt::Closed {
                view.prompt = InitPrompt::Manual;
            }
        });
    }

    /// Closes a manually opened prompt. A required prompt stays open.
    pub fn dismiss_prompt(&self) -> bool {
        self.mutate(|view| match view.prompt {
            InitPrompt::Required => false,
            InitPrompt::Manual | InitPrompt::Closed => {
                view.prompt = InitPrompt::Closed;
                true
            }
        })
    }
}
