//! GitHub App installations, their repositories and branches.

use reqwest::Method;
use tracing::debug;

use crate::api::{Branches, Endpoint, InstallationItem, Installations, Repositories, RepositoryItem};
use crate::core::error::{codes, ApiError};
use crate::core::http::{ApiClient, HttpRequest};

pub const DEFAULT_PER_PAGE: u32 = 30;

#[derive(Clone)]
pub struct RepoService {
    client: ApiClient,
    per_page: u32,
}

impl RepoService {
    pub fn new(client: ApiClient, per_page: u32) -> Self {
        Self {
            client,
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub async fn installations(&self) -> Result<Vec<InstallationItem>, ApiError> {
        let response: Installations = self.client.get(&Endpoint::Installations.path()).await?;
        Ok(response.installations)
    }

    /// Fetches one page (1-based) of repositories for an installation.
    pub async fn repositories(
        &self,
        installation_id: &str,
        page: u32,
    ) -> Result<Repositories, ApiError> {
        let request = HttpRequest::new(Method::GET, Endpoint::Repositories.path())
            .query("installation_id", installation_id)
            .query("page", page)
            .query("per_page", self.per_page);
        let repositories: Repositories = self.client.request(request).await?;
        debug!(
            installation_id,
            page,
            fetched = repositories.repositories.len(),
            total = repositories.total_count,
            "Repository page fetched"
        );
        Ok(repositories)
    }

    pub async fn branches(&self, owner: &str, name: &str) -> Result<Vec<String>, ApiError> {
        let response: Branches = self
            .client
            .get(&Endpoint::Branches.with(&[owner, name]))
            .await?;
        Ok(response.branches)
    }
}

/// Page number to fetch after `pages`, or `None` when the listing is complete.
///
/// A short last page ends the listing, as does having fetched `totalCount`
/// repositories.
pub fn next_page(pages: &[Repositories], per_page: u32) -> Option<u32> {
    let Some(last) = pages.last() else {
        return Some(1);
    };
    if (last.repositories.len() as u64) < u64::from(per_page) {
        return None;
    }
    let fetched: u64 = pages
        .iter()
        .map(|page| page.repositories.len() as u64)
        .sum();
    (fetched < last.total_count).then(|| pages.len() as u32 + 1)
}

/// Accumulates repository pages for one installation.
pub struct RepositoryPager {
    installation_id: String,
    pages: Vec<Repositories>,
}

impl RepositoryPager {
    pub fn new(installation_id: &str) -> Self {
        Self {
            installation_id: installation_id.to_string(),
            pages: Vec::new(),
        }
    }

    pub fn has_more(&self, per_page: u32) -> bool {
        next_page(&self.pages, per_page).is_some()
    }

    /// Fetches the next page; returns how many repositories it added.
    pub async fn fetch_next(&mut self, service: &RepoService) -> Result<usize, ApiError> {
        let Some(page) = next_page(&self.pages, service.per_page()) else {
            return Ok(0);
        };
        let fetched = service.repositories(&self.installation_id, page).await?;
        let added = fetched.repositories.len();
        self.pages.push(fetched);
        Ok(added)
    }

    pub fn repositories(&self) -> Vec<&RepositoryItem> {
        self.pages
            .iter()
            .flat_map(|page| page.repositories.iter())
            .collect()
    }
}

/// Case-insensitive name filter; a blank keyword keeps everything.
pub fn filter_repositories<'a>(
    repositories: impl IntoIterator<Item = &'a RepositoryItem>,
    keyword: &str,
) -> Vec<&'a RepositoryItem> {
    let keyword = keyword.trim().to_lowercase();
    repositories
        .into_iter()
        .filter(|repository| keyword.is_empty() || repository.name.to_lowercase().contains(&keyword))
        .collect()
}

/// The branch a task runs against: the user's choice, else the first branch.
pub fn resolve_branch(branches: &[String], selection: Option<&str>) -> Result<String, ApiError> {
    match selection.map(str::trim).filter(|branch| !branch.is_empty()) {
        Some(branch) if branches.iter().any(|known| known == branch) => Ok(branch.to_string()),
        Some(branch) => Err(ApiError::client(
            codes::INVALID_REQUEST,
            format!("Branch '{branch}' does not exist in this repository."),
        )),
        None => branches.first().cloned().ok_or_else(|| {
            ApiError::client(codes::INVALID_REQUEST, "The repository has no branches.")
        }),
    }
}
