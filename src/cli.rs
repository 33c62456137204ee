use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::commands::{self, CommandContext, JobTree, PromptPicker, Session};
use crate::config::Config;
use crate::error::{CiLocalError, Result as CommandResult};
use crate::output::{self, RunProgress};
use crate::pipeline::{JobFilter, PipelineDocument};
use crate::runner::RunOutcome;
use crate::status::StatusTracker;
use crate::workspace::Workspace;

#[derive(Parser)]
#[command(name = "glci")]
#[command(author, version, about = "Run GitLab CI jobs locally with gitlab-ci-local", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./glci.toml, .json, .yaml or .yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace folder to search for .gitlab-ci.yml; repeatable, searched in order
    #[arg(short = 'w', long = "workspace", global = true)]
    workspaces: Vec<PathBuf>,

    /// Path to the gitlab-ci-local executable
    #[arg(short, long, global = true, env = "GITLAB_CI_LOCAL")]
    executable: Option<PathBuf>,

    /// Only offer jobs that define a script when choosing interactively
    #[arg(long, global = true, default_value_t = false)]
    strict: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value_t = false)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job in the pipeline
    RunAll,

    /// Run jobs by name, or choose one from a list when none is given
    Run { jobs: Vec<String> },

    /// Validate the pipeline file
    Validate,

    /// Show the jobs of the pipeline
    Jobs {
        /// List every non-reserved, non-hidden key, not just jobs with a script
        #[arg(short, long, default_value_t = false)]
        all: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Interactive session that keeps job statuses between runs
    Session,
}

impl Cli {
    /// Runs the selected command. Returns `false` when it failed; the error
    /// has already been reported.
    pub async fn execute(&self) -> Result<bool> {
        let config = self.load_config()?;
        if !config.output.color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        let workspace = Workspace::new(self.workspace_folders()?);
        let tracker = Arc::new(StatusTracker::new());
        let ctx = CommandContext::new(workspace, config, tracker);

        match &self.command {
            Commands::RunAll => Ok(Self::execute_run(ctx, "pipeline", |ctx| async move {
                vec![commands::run_all(&ctx).await]
            })
            .await),
            Commands::Validate => Ok(Self::execute_run(ctx, "validation", |ctx| async move {
                vec![commands::validate(&ctx).await]
            })
            .await),
            Commands::Run { jobs } => Ok(self.execute_jobs(ctx, jobs).await),
            Commands::Jobs { all, json } => self.execute_list(&ctx, *all, *json),
            Commands::Session => {
                info!("Starting interactive session");
                Session::new(ctx).run(commands::stdin_lines()).await?;
                Ok(true)
            }
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(executable) = &self.executable {
            config.runner.executable = Some(executable.clone());
        }
        if self.strict {
            config.selection.filter = JobFilter::Strict;
        }
        if self.no_color {
            config.output.color = false;
        }
        Ok(config)
    }

    fn workspace_folders(&self) -> CommandResult<Vec<PathBuf>> {
        if self.workspaces.is_empty() {
            return Ok(vec![std::env::current_dir()?]);
        }

        for folder in &self.workspaces {
            if !folder.is_dir() {
                return Err(CiLocalError::Config(format!(
                    "Workspace folder does not exist: {}",
                    folder.display()
                )));
            }
        }
        Ok(self.workspaces.clone())
    }

    async fn execute_jobs(&self, ctx: CommandContext, jobs: &[String]) -> bool {
        let jobs = if jobs.is_empty() {
            match commands::pick_job(&ctx, &PromptPicker) {
                Ok(Some(name)) => vec![name],
                Ok(None) => return true,
                Err(e) => {
                    commands::report(&e);
                    return e.is_warning();
                }
            }
        } else {
            jobs.to_vec()
        };

        let what = jobs.join(", ");
        Self::execute_run(ctx, &what, |ctx| async move {
            commands::run_jobs(&ctx, &jobs).await
        })
        .await
    }

    // Runs under a spinner, reports every failure, then prints a summary.
    async fn execute_run<F, Fut>(ctx: CommandContext, what: &str, run: F) -> bool
    where
        F: FnOnce(Arc<CommandContext>) -> Fut,
        Fut: std::future::Future<Output = Vec<CommandResult<RunOutcome>>>,
    {
        let progress = RunProgress::start(what);
        let ctx = Arc::new(ctx.with_progress(progress.bar()));

        let results = run(Arc::clone(&ctx)).await;

        let mut succeeded = true;
        let mut outcomes = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => {
                    succeeded &= outcome.success;
                    outcomes.push(outcome);
                }
                Err(e) => {
                    succeeded = false;
                    progress.bar().suspend(|| commands::report(&e));
                }
            }
        }

        progress.finish(what, succeeded);
        for outcome in &outcomes {
            output::print_outcome(outcome);
        }
        if outcomes.iter().any(|o| o.invocation.job_name().is_some()) {
            print!("{}", output::render_status(&ctx.tracker().snapshot()));
        }

        succeeded
    }

    fn execute_list(&self, ctx: &CommandContext, all: bool, json: bool) -> Result<bool> {
        let listing = if all {
            list_all_jobs(ctx).map(Listing::Names)
        } else {
            commands::refresh_job_tree(ctx).map(Listing::Tree)
        };

        let listing = match listing {
            Ok(listing) => listing,
            Err(e) => {
                commands::report(&e);
                return Ok(false);
            }
        };

        match (listing, json) {
            (Listing::Names(names), true) => println!("{}", serde_json::to_string_pretty(&names)?),
            (Listing::Names(names), false) => print!("{}", output::render_job_names(&names)),
            (Listing::Tree(tree), true) => println!("{}", serde_json::to_string_pretty(&tree.nodes)?),
            (Listing::Tree(tree), false) => output::print_job_tree(&tree),
        }

        Ok(true)
    }
}

enum Listing {
    Names(Vec<String>),
    Tree(JobTree),
}

fn list_all_jobs(ctx: &CommandContext) -> CommandResult<Vec<String>> {
    let ci = ctx.ci_file()?;
    let names = PipelineDocument::load(&ci.path)?.job_names(JobFilter::Permissive);
    if names.is_empty() {
        return Err(CiLocalError::EmptyJobSet);
    }
    Ok(names)
}
