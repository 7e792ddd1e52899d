//! Command-line interface parsing and handling
//!
//! Each invocation runs one command against the configured API and exits.

pub mod account;
pub mod config;
pub mod context;
pub mod repo;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::SplitMode;
use crate::cli::config::ConfigCommand;
use crate::cli::context::CliContext;
use crate::cli::repo::RepoSlug;
use crate::core::config::Config;
use crate::utils::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "readmegen")]
#[command(about = "Generate, edit and evaluate GitHub READMEs from the terminal")]
#[command(
    long_about = "readmegen talks to a README generation service: it lists the repositories \
your GitHub App installation can reach, splits a README into editable sections, asks the \
service for an AI draft or an evaluation, and opens a pull request with the result.\n\n\
Environment Variables:\n\
  READMEGEN_API_URL   API origin (overrides the api-url setting)\n\
  READMEGEN_CONFIG    Path to the configuration file\n\
  RUST_LOG            Diagnostic log filter (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Append diagnostic logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the stored session is valid
    Status,
    /// Finish a browser login and store the session
    Login {
        /// Cookie header copied from the browser after signing in
        #[arg(long, value_name = "VALUE")]
        cookie: Option<String>,
    },
    /// End the session on the server and forget it locally
    Logout,
    /// Delete the account and forget the session
    Withdraw,
    /// List GitHub App installations
    Installations,
    /// List repositories of an installation
    Repos {
        installation_id: String,
        /// Fetch only this page (1-based)
        #[arg(long)]
        page: Option<u32>,
        /// Case-insensitive name filter
        #[arg(long, value_name = "KEYWORD")]
        filter: Option<String>,
    },
    /// List branches of a repository
    Branches { repo: RepoSlug },
    /// Show the README sections of a repository
    Sections { repo: RepoSlug },
    /// Split the repository's README into sections
    Init {
        repo: RepoSlug,
        #[arg(long)]
        branch: Option<String>,
        /// split or whole
        #[arg(long, value_name = "MODE")]
        split_mode: Option<SplitMode>,
    },
    /// Generate a README draft
    Generate {
        repo: RepoSlug,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Evaluate the current sections as a draft
    Evaluate {
        repo: RepoSlug,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Open a pull request with the assembled README
    Pr {
        repo: RepoSlug,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Read or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print version and build information
    Version,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;
    tokio::runtime::Runtime::new()?.block_on(async_main(args.command))
}

async fn async_main(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Config { command } => config::run(command),
        Commands::Version => {
            print_version_info();
            Ok(())
        }
        command => {
            let mut ctx = CliContext::new(Config::load()?)?;
            let result = run_remote(&ctx, command).await;
            ctx.print_notices();
            if result.is_ok() {
                ctx.persist_session()?;
            }
            if let Err(err) = result {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run_remote(ctx: &CliContext, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Status => account::status(ctx).await,
        Commands::Login { cookie } => account::login(ctx, cookie.as_deref()).await,
        Commands::Logout => account::logout(ctx).await,
        Commands::Withdraw => account::withdraw(ctx).await,
        Commands::Installations => repo::installations(ctx).await,
        Commands::Repos {
            installation_id,
            page,
            filter,
        } => repo::repositories(ctx, &installation_id, page, filter.as_deref()).await,
        Commands::Branches { repo } => repo::branches(ctx, &repo).await,
        Commands::Sections { repo } => repo::sections(ctx, &repo).await,
        Commands::Init {
            repo,
            branch,
            split_mode,
        } => repo::init(ctx, &repo, branch.as_deref(), split_mode).await,
        Commands::Generate { repo, branch } => repo::generate(ctx, &repo, branch.as_deref()).await,
        Commands::Evaluate { repo, branch } => repo::evaluate(ctx, &repo, branch.as_deref()).await,
        Commands::Pr { repo, branch } => repo::pull_request(ctx, &repo, branch.as_deref()).await,
        Commands::Config { .. } | Commands::Version => Ok(()),
    }
}

fn print_version_info() {
    println!("readmegen {}", env!("CARGO_PKG_VERSION"));
    println!(
        "commit: {} ({})",
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_GIT_BRANCH").unwrap_or("unknown")
    );
    println!(
        "built: {}",
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    );
    println!(
        "rustc: {}",
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    );
    println!(
        "target: {}",
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    );
}
