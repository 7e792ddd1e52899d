//! Repository, section, and task commands.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::api::{Evaluation, InitSectionRequest, Section, SplitMode};
use crate::cli::context::CliContext;
use crate::core::actions::{EvaluateAction, EvaluationCache, GenerateAction, PullRequestAction};
use crate::core::error::ApiError;
use crate::core::repos::{filter_repositories, resolve_branch, RepoService, RepositoryPager};
use crate::core::sections::{LoadOutcome, SectionManager};
use crate::utils::url::parse_repo_slug;

/// `owner/name` as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_repo_slug(value)
            .map(|(owner, name)| RepoSlug { owner, name })
            .ok_or_else(|| format!("expected <owner>/<name>, got '{value}'"))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn repo_service(ctx: &CliContext) -> RepoService {
    RepoService::new(ctx.client.clone(), ctx.config.per_page())
}

fn section_manager(ctx: &CliContext, repo: &RepoSlug) -> SectionManager {
    ctx.client
        .set_current_path(&format!("/repos/{}/{}", repo.owner, repo.name));
    SectionManager::new(
        ctx.client.clone(),
        &repo.owner,
        &repo.name,
        ctx.notifier.clone(),
    )
}

async fn branch_for(
    ctx: &CliContext,
    repo: &RepoSlug,
    selection: Option<&str>,
) -> Result<String, ApiError> {
    let branches = repo_service(ctx).branches(&repo.owner, &repo.name).await?;
    resolve_branch(&branches, selection)
}

/// Loads sections, turning the "not initialized" outcome into an error for
/// commands that need content.
async fn load_sections(ctx: &CliContext, repo: &RepoSlug) -> Result<SectionManager, Box<dyn Error>> {
    let manager = section_manager(ctx, repo);
    match manager.load().await? {
        LoadOutcome::Loaded => Ok(manager),
        LoadOutcome::NeedsInit => Err(format!(
            "{repo} has no sections yet; run `readmegen init {repo}` first"
        )
        .into()),
    }
}

fn print_sections(sections: &[Section]) {
    for section in sections {
        println!("{:>3}. {} (id {})", section.order_idx, section.title, section.id);
    }
}

pub async fn installations(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let installations = repo_service(ctx).installations().await?;
    if installations.is_empty() {
        println!("No GitHub App installations found.");
    }
    for installation in installations {
        println!("{}\t{}", installation.installation_id, installation.name);
    }
    Ok(())
}

/// One page when `page` is given, otherwise every page.
pub async fn repositories(
    ctx: &CliContext,
    installation_id: &str,
    page: Option<u32>,
    filter: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let service = repo_service(ctx);
    let keyword = filter.unwrap_or_default();

    let listed = match page {
        Some(page) => service.repositories(installation_id, page.max(1)).await?.repositories,
        None => {
            let mut pager = RepositoryPager::new(installation_id);
            while pager.has_more(service.per_page()) {
                if pager.fetch_next(&service).await? == 0 {
                    break;
                }
            }
            pager.repositories().into_iter().cloned().collect()
        }
    };

    for repository in filter_repositories(&listed, keyword) {
        println!("{}/{}", repository.owner, repository.name);
    }
    Ok(())
}

pub async fn branches(ctx: &CliContext, repo: &RepoSlug) -> Result<(), Box<dyn Error>> {
    for branch in repo_service(ctx).branches(&repo.owner, &repo.name).await? {
        println!("{branch}");
    }
    Ok(())
}

pub async fn sections(ctx: &CliContext, repo: &RepoSlug) -> Result<(), Box<dyn Error>> {
    let manager = section_manager(ctx, repo);
    match manager.load().await? {
        LoadOutcome::Loaded => print_sections(&manager.sections()),
        LoadOutcome::NeedsInit => {
            println!("{repo} has no sections yet. Run `readmegen init {repo}` to create them.")
        }
    }
    Ok(())
}

pub async fn init(
    ctx: &CliContext,
    repo: &RepoSlug,
    branch: Option<&str>,
    split_mode: Option<SplitMode>,
) -> Result<(), Box<dyn Error>> {
    let branch = branch_for(ctx, repo, branch).await?;
    let manager = section_manager(ctx, repo);
    let request = InitSectionRequest {
        branch,
        split_mode: split_mode.unwrap_or_else(|| ctx.config.split_mode()),
    };
    manager.init_sections(request).await?;
    print_sections(&manager.sections());
    Ok(())
}

pub async fn generate(
    ctx: &CliContext,
    repo: &RepoSlug,
    branch: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let branch = branch_for(ctx, repo, branch).await?;
    let manager = section_manager(ctx, repo);
    let action = GenerateAction::new(
        ctx.client.clone(),
        manager.clone(),
        ctx.config.task_timeouts(),
        ctx.notifier.clone(),
    );
    action.run(&branch).await?;
    println!("{}", manager.full_content());
    Ok(())
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("Status: {:?}", evaluation.status);
    if let Some(rating) = evaluation.rating {
        println!("Rating: {rating:.1}");
    }
    for item in evaluation.contents.iter().flatten() {
        println!("  - {item}");
    }
}

pub async fn evaluate(
    ctx: &CliContext,
    repo: &RepoSlug,
    branch: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let branch = branch_for(ctx, repo, branch).await?;
    let manager = load_sections(ctx, repo).await?;
    let action = EvaluateAction::new(
        ctx.client.clone(),
        manager,
        EvaluationCache::default(),
        ctx.config.task_timeouts(),
        ctx.notifier.clone(),
    );
    let cached = action.run(&branch).await?;
    print_evaluation(&cached.evaluation);
    Ok(())
}

pub async fn pull_request(
    ctx: &CliContext,
    repo: &RepoSlug,
    branch: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let branch = branch_for(ctx, repo, branch).await?;
    let manager = load_sections(ctx, repo).await?;
    let action = PullRequestAction::new(ctx.client.clone(), manager, ctx.notifier.clone());
    let created = action.run(&branch).await?;
    match (created.url, created.number) {
        (Some(url), _) => println!("{url}"),
        (None, Some(number)) => println!("Pull request #{number} opened"),
        (None, None) => println!("Pull request opened"),
    }
    Ok(())
}
