use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::picker::choose;
use super::{report, CommandContext, JobTree};
use crate::error::Result;
use crate::output::{
    bright, cyan, dim, print_job_tree, render_job_names, render_status, render_status_line,
    warning,
};
use crate::runner::RunOutcome;
use crate::status::StatusTracker;

const HELP: &[(&str, &str)] = &[
    ("run-all", "run every job in the pipeline"),
    ("run [JOB]", "run one job, choosing from a list when JOB is omitted"),
    ("validate", "validate the pipeline file"),
    ("tree", "reload the job tree (aliases: refresh, jobs)"),
    ("pick <JOB|N>", "run a job from the last job tree; #N always means position N"),
    ("status", "show the status of every job run so far"),
    ("quit", "stop running jobs and leave"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    RunAll,
    Run(Option<String>),
    Validate,
    Tree,
    Pick(String),
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parses one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word {
            "run-all" | "all" => Self::RunAll,
            "run" if rest.is_empty() => Self::Run(None),
            "run" => Self::Run(Some(rest.to_string())),
            "validate" => Self::Validate,
            "tree" | "refresh" | "jobs" => Self::Tree,
            "pick" if rest.is_empty() => return Err("Usage: pick <JOB|N>".to_string()),
            "pick" => Self::Pick(rest.to_string()),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("Unknown command '{other}', type 'help'")),
        };
        Ok(Some(command))
    }
}

/// Interactive session.
///
/// Owns the status registry for as long as it runs. Job runs are spawned in
/// the background so several can be in flight; a watcher prints the registry
/// every time it changes.
pub struct Session {
    ctx: Arc<CommandContext>,
    tree: JobTree,
    runs: JoinSet<()>,
}

impl Session {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tree: JobTree::default(),
            runs: JoinSet::new(),
        }
    }

    /// Processes commands from `input` until `quit`, Ctrl-C or end of input.
    ///
    /// On end of input the session waits for runs in flight. On `quit` and
    /// Ctrl-C they are aborted, which kills their runner processes.
    pub async fn run(mut self, mut input: mpsc::UnboundedReceiver<String>) -> Result<()> {
        let watcher = watch_statuses(Arc::clone(self.ctx.tracker()));

        self.refresh_tree();
        println!("{}", dim("Type 'help' for commands."));

        let aborted = loop {
            prompt();
            let line = tokio::select! {
                line = input.recv() => line,
                _ = tokio::signal::ctrl_c() => break true,
            };
            let Some(line) = line else {
                break false;
            };

            match SessionCommand::parse(&line) {
                Ok(None) => {}
                Ok(Some(SessionCommand::Quit)) => break true,
                Ok(Some(command)) => self.dispatch(command, &mut input).await,
                Err(message) => eprintln!("{}", warning(message)),
            }

            while let Some(finished) = self.runs.try_join_next() {
                if let Err(e) = finished {
                    warn!("Job run task ended abnormally: {e}");
                }
            }
        };

        if aborted {
            if !self.runs.is_empty() {
                info!("Stopping {} runs in progress", self.runs.len());
            }
            self.runs.shutdown().await;
        } else {
            while self.runs.join_next().await.is_some() {}
        }

        watcher.abort();
        Ok(())
    }

    async fn dispatch(
        &mut self,
        command: SessionCommand,
        input: &mut mpsc::UnboundedReceiver<String>,
    ) {
        let ctx = Arc::clone(&self.ctx);
        match command {
            SessionCommand::RunAll => self.spawn(async move { super::run_all(&ctx).await }),
            SessionCommand::Validate => self.spawn(async move { super::validate(&ctx).await }),
            SessionCommand::Run(Some(name)) => {
                self.spawn(async move { super::run_job(&ctx, name).await });
            }
            SessionCommand::Run(None) => match self.select(input).await {
                Ok(Some(name)) => self.spawn(async move { super::run_job(&ctx, name).await }),
                Ok(None) => {}
                Err(e) => report(&e),
            },
            SessionCommand::Tree => self.refresh_tree(),
            SessionCommand::Pick(job_ref) => {
                self.tree.refresh_statuses(self.ctx.tracker());
                let tree = self.tree.clone();
                self.spawn(async move { super::run_job_from_tree(&ctx, &tree, &job_ref).await });
            }
            SessionCommand::Status => print!("{}", render_status(&self.ctx.tracker().snapshot())),
            SessionCommand::Help => print_help(),
            SessionCommand::Quit => {}
        }
    }

    // Reads the choice from the session input so that it does not race the
    // command loop for stdin.
    async fn select(&self, input: &mut mpsc::UnboundedReceiver<String>) -> Result<Option<String>> {
        let ci = self.ctx.ci_file()?;
        let names = self.ctx.selectable_jobs(&ci)?;

        println!("{}", bright("Select a GitLab CI job to run locally"));
        print!("{}", render_job_names(&names));
        print!("  [1-{}, empty to cancel]: ", names.len());
        let _ = std::io::stdout().flush();

        let Some(line) = input.recv().await else {
            return Ok(None);
        };
        let choice = choose(&names, &line);
        if choice.is_none() && !line.trim().is_empty() {
            eprintln!("{}", warning(format!("No job matches '{}'", line.trim())));
        }
        Ok(choice)
    }

    fn refresh_tree(&mut self) {
        match super::refresh_job_tree(&self.ctx) {
            Ok(tree) => {
                self.tree = tree;
                print_job_tree(&self.tree);
            }
            Err(e) => {
                self.tree = JobTree::default();
                report(&e);
            }
        }
    }

    fn spawn<F>(&mut self, run: F)
    where
        F: Future<Output = Result<RunOutcome>> + Send + 'static,
    {
        self.runs.spawn(async move {
            if let Err(e) = run.await {
                report(&e);
            }
        });
    }
}

/// Feeds stdin lines into a channel from a dedicated thread.
///
/// The thread is not tied to the runtime, so a blocked read never holds up
/// shutdown.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });
    rx
}

fn watch_statuses(tracker: Arc<StatusTracker>) -> JoinHandle<()> {
    let mut subscriber = tracker.subscribe();
    tokio::spawn(async move {
        while subscriber.changed().await {
            let entries = tracker.snapshot();
            if !entries.is_empty() {
                eprintln!("{}", render_status_line(&entries));
            }
        }
    })
}

fn prompt() {
    print!("{} ", cyan("glci>"));
    let _ = std::io::stdout().flush();
}

fn print_help() {
    for (command, description) in HELP {
        println!("  {:<14} {}", cyan(command), dim(description));
    }
}
