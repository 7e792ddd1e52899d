use tracing::info;

use crate::api::{GenerateRequest, Sections};
use crate::core::error::ApiError;
use crate::core::http::ApiClient;
use crate::core::notice::Notifier;
use crate::core::sections::SectionManager;
use crate::core::task::{Generation, TaskRunner, TaskTimeouts};

/// Regenerates the README draft and replaces the local sections with it.
pub struct GenerateAction {
    runner: TaskRunner<Generation>,
    sections: SectionManager,
    notices: Notifier,
}

impl GenerateAction {
    pub fn new(
        client: ApiClient,
        sections: SectionManager,
        timeouts: TaskTimeouts,
        notices: Notifier,
    ) -> Self {
        Self {
            runner: TaskRunner::new(client, timeouts),
            sections,
            notices,
        }
    }

    pub fn runner(&self) -> &TaskRunner<Generation> {
        &self.runner
    }

    pub async fn run(&self, branch: &str) -> Result<Sections, ApiError> {
        let owner = self.sections.owner();
        let name = self.sections.name();
        let request = GenerateRequest {
            branch: branch.to_string(),
        };

        match self.runner.run(owner, name, &request).await {
            Ok(generated) => {
                info!(count = generated.sections.len(), branch, "Draft generated");
                self.sections.replace_all(generated.sections.clone());
                self.notices.success("README draft generated.");
                Ok(generated)
            }
            Err(err) => {
                self.notices.error("Failed to generate the README draft.");
                Err(err)
            }
        }
    }
}

impl Drop for GenerateAction {
    fn drop(&mut self) {
        self.runner
            .discard(self.sections.owner(), self.sections.name());
    }
}
