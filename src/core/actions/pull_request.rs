use tracing::info;

use crate::api::{CreatePullRequestRequest, Endpoint, PullRequest};
use crate::core::error::ApiError;
use crate::core::http::ApiClient;
use crate::core::notice::Notifier;
use crate::core::sections::SectionManager;

/// Opens a pull request carrying the assembled README.
pub struct PullRequestAction {
    client: ApiClient,
    sections: SectionManager,
    notices: Notifier,
}

impl PullRequestAction {
    pub fn new(client: ApiClient, sections: SectionManager, notices: Notifier) -> Self {
        Self {
            client,
            sections,
            notices,
        }
    }

    pub async fn run(&self, branch: &str) -> Result<PullRequest, ApiError> {
        let path = Endpoint::PullRequest.with(&[self.sections.owner(), self.sections.name()]);
        let request = CreatePullRequestRequest {
            branch: branch.to_string(),
            content: self.sections.full_content(),
        };

        match self
            .client
            .post::<Option<PullRequest>, _>(&path, &request)
            .await
        {
            Ok(created) => {
                let created = created.unwrap_or_default();
                info!(branch, url = ?created.url, "Pull request created");
                self.notices.success("Pull request created.");
                Ok(created)
            }
            Err(err) => {
                self.notices.error("Failed to create the pull request.");
                Err(err)
            }
        }
    }
}
