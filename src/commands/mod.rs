//! The user-facing command set.
//!
//! Every command returns its own error; callers hand it to [`report`] so that
//! nothing escapes the command boundary.

mod picker;
mod session;
mod tree;

use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::{CiLocalError, Result};
use crate::output;
use crate::pipeline::{extract_job_names, PipelineDocument};
use crate::runner::{resolve_executable, Invocation, JobLauncher, RunOutcome, TerminalSink};
use crate::status::StatusTracker;
use crate::workspace::{CiFile, Workspace};

pub use picker::{JobPicker, PromptPicker};
pub use session::{stdin_lines, Session};
pub use tree::{JobTree, TreeNode};

/// Everything a command needs: where to look, how to run, and the status
/// registry it reports to.
pub struct CommandContext {
    workspace: Workspace,
    config: Config,
    tracker: Arc<StatusTracker>,
    progress: Option<ProgressBar>,
}

impl CommandContext {
    pub fn new(workspace: Workspace, config: Config, tracker: Arc<StatusTracker>) -> Self {
        Self {
            workspace,
            config,
            tracker,
            progress: None,
        }
    }

    /// Routes runner output around a spinner.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    pub fn ci_file(&self) -> Result<CiFile> {
        self.workspace.find_ci_file()
    }

    pub fn launcher(&self, ci: &CiFile) -> JobLauncher {
        let executable = resolve_executable(self.config.runner.executable.as_deref(), &ci.root);
        JobLauncher::new(executable, Arc::clone(&self.tracker))
            .with_timeout(self.config.runner.timeout_secs.map(Duration::from_secs))
    }

    pub fn sink(&self, invocation: &Invocation) -> TerminalSink {
        let mut sink = TerminalSink::new(self.config.runner.line_ending);
        if self.config.output.prefix_output {
            sink = sink.with_label(invocation.label());
        }
        if let Some(pb) = &self.progress {
            sink = sink.with_progress(pb.clone());
        }
        sink
    }

    /// Jobs offered for interactive selection, using the configured filter.
    ///
    /// # Errors
    ///
    /// `EmptyJobSet` when the pipeline has nothing to offer, or any error from
    /// reading and parsing the pipeline file.
    pub fn selectable_jobs(&self, ci: &CiFile) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(&ci.path)?;
        let names = extract_job_names(&text, self.config.selection.filter)?;
        if names.is_empty() {
            return Err(CiLocalError::EmptyJobSet);
        }
        Ok(names)
    }

    async fn launch(&self, invocation: Invocation) -> Result<RunOutcome> {
        let ci = self.ci_file()?;
        let sink = self.sink(&invocation);
        self.launcher(&ci).launch(&invocation, &ci.root, &sink).await
    }
}

/// Runs the whole pipeline.
pub async fn run_all(ctx: &CommandContext) -> Result<RunOutcome> {
    ctx.launch(Invocation::All).await
}

/// Asks the runner to validate the pipeline file.
pub async fn validate(ctx: &CommandContext) -> Result<RunOutcome> {
    ctx.launch(Invocation::Validate).await
}

/// Runs one named job. The name is passed through to the runner as is.
pub async fn run_job(ctx: &CommandContext, name: String) -> Result<RunOutcome> {
    ctx.launch(Invocation::Job(name)).await
}

/// Runs several named jobs at once, each with its own output surface.
pub async fn run_jobs(ctx: &CommandContext, names: &[String]) -> Vec<Result<RunOutcome>> {
    let runs = names.iter().map(|name| run_job(ctx, name.clone()));
    futures::future::join_all(runs).await
}

/// Lets the user choose a job. `Ok(None)` means the selection was cancelled.
pub fn pick_job(ctx: &CommandContext, picker: &dyn JobPicker) -> Result<Option<String>> {
    let ci = ctx.ci_file()?;
    let names = ctx.selectable_jobs(&ci)?;
    let choice = picker.pick(&names)?;
    if choice.is_none() {
        info!("Job selection cancelled");
    }
    Ok(choice)
}

/// Re-reads the pipeline file and rebuilds the job tree with current statuses.
pub fn refresh_job_tree(ctx: &CommandContext) -> Result<JobTree> {
    let ci = ctx.ci_file()?;
    let document = PipelineDocument::load(&ci.path)?;
    let tree = JobTree::build(&document, &ctx.tracker);
    ctx.tracker.notify_changed();
    Ok(tree)
}

/// Runs the job `job_ref` points at in `tree` (1-based position or name).
pub async fn run_job_from_tree(
    ctx: &CommandContext,
    tree: &JobTree,
    job_ref: &str,
) -> Result<RunOutcome> {
    let node = tree
        .resolve(job_ref)
        .ok_or_else(|| CiLocalError::UnknownJob(job_ref.trim().to_string()))?;
    run_job(ctx, node.name.clone()).await
}

/// Shows a command error to the user.
pub fn report(error: &CiLocalError) {
    if error.is_warning() {
        warn!("{error}");
        eprintln!("{}", output::warning(error));
    } else {
        debug!("{error:?}");
        eprintln!("{}", output::error(error));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::status::JobStatus;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    pub(super) const PIPELINE: &str = r#"
stages: [build, deploy]
variables:
  GREETING: hi
notes: "not a job"
build:
  stage: build
  script: make
deploy:
  stage: deploy
  script: make deploy
.template:
  script: nope
"#;

    pub(super) fn project(pipeline: &str, runner_body: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitlab-ci.yml"), pipeline).unwrap();

        let runner = dir.path().join("fake-runner");
        fs::write(&runner, format!("#!/bin/sh\n{runner_body}\n")).unwrap();
        let mut perms = fs::metadata(&runner).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&runner, perms).unwrap();

        (dir, runner)
    }

    pub(super) fn context(folder: &Path, runner: PathBuf) -> CommandContext {
        let mut config = Config::default();
        config.runner.executable = Some(runner);
        CommandContext::new(
            Workspace::new(vec![folder.to_path_buf()]),
            config,
            Arc::new(StatusTracker::new()),
        )
    }

    struct FixedPicker(&'static str);

    impl JobPicker for FixedPicker {
        fn pick(&self, names: &[String]) -> Result<Option<String>> {
            Ok(picker::choose(names, self.0))
        }
    }

    #[tokio::test]
    async fn test_run_job_records_success() {
        let (dir, runner) = project(PIPELINE, "echo \"$*\"");
        let ctx = context(dir.path(), runner);

        let outcome = run_job(&ctx, "build".into()).await.unwrap();

        assert!(outcome.success);
        assert_eq!(ctx.tracker().get("build"), Some(JobStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_run_job_from_relative_workspace_with_local_runner() {
        let dir = TempDir::new_in(".").unwrap();
        fs::write(dir.path().join(".gitlab-ci.yml"), PIPELINE).unwrap();
        let bin = dir.path().join("node_modules").join(".bin");
        fs::create_dir_all(&bin).unwrap();
        let runner = bin.join("gitlab-ci-local");
        fs::write(&runner, "#!/bin/sh\necho \"$*\"\n").unwrap();
        fs::set_permissions(&runner, fs::Permissions::from_mode(0o755)).unwrap();

        let relative = PathBuf::from(dir.path().file_name().unwrap());
        let ctx = CommandContext::new(
            Workspace::new(vec![relative]),
            Config::default(),
            Arc::new(StatusTracker::new()),
        );

        let outcome = run_job(&ctx, "build".into()).await.unwrap();

        assert!(outcome.success);
        assert_eq!(ctx.tracker().get("build"), Some(JobStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_run_job_records_failure() {
        let (dir, runner) = project(PIPELINE, "exit 1");
        let ctx = context(dir.path(), runner);

        let outcome = run_job(&ctx, "test".into()).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(ctx.tracker().get("test"), Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_run_jobs_runs_each_job() {
        let (dir, runner) = project(PIPELINE, "sleep 0.1; echo \"$*\"");
        let ctx = context(dir.path(), runner);

        let results = run_jobs(&ctx, &["build".to_string(), "deploy".to_string()]).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|o| o.success)));
        assert_eq!(ctx.tracker().get("build"), Some(JobStatus::Succeeded));
        assert_eq!(ctx.tracker().get("deploy"), Some(JobStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_run_all_and_validate_do_not_touch_tracker() {
        let (dir, runner) = project(PIPELINE, "exit 0");
        let ctx = context(dir.path(), runner);

        assert!(run_all(&ctx).await.unwrap().success);
        assert!(validate(&ctx).await.unwrap().success);
        assert!(ctx.tracker().snapshot().is_empty());
    }

    #[test]
    fn test_pick_job_uses_permissive_filter_by_default() {
        let (dir, runner) = project(PIPELINE, "exit 0");
        let ctx = context(dir.path(), runner);

        assert_eq!(pick_job(&ctx, &FixedPicker("1")).unwrap(), Some("notes".into()));
        assert_eq!(pick_job(&ctx, &FixedPicker("deploy")).unwrap(), Some("deploy".into()));
        assert_eq!(pick_job(&ctx, &FixedPicker("")).unwrap(), None);
    }

    #[test]
    fn test_pick_job_with_strict_selection() {
        let (dir, runner) = project(PIPELINE, "exit 0");
        let mut ctx = context(dir.path(), runner);
        ctx.config.selection.filter = crate::pipeline::JobFilter::Strict;

        assert_eq!(pick_job(&ctx, &FixedPicker("1")).unwrap(), Some("build".into()));
    }

    #[test]
    fn test_pick_job_without_jobs_is_a_warning() {
        let (dir, runner) = project("variables:\n  A: 1\n.hidden:\n  script: x\n", "exit 0");
        let ctx = context(dir.path(), runner);

        let error = pick_job(&ctx, &FixedPicker("1")).unwrap_err();
        assert!(matches!(error, CiLocalError::EmptyJobSet));
        assert!(error.is_warning());
    }

    #[test]
    fn test_pick_job_reports_parse_errors() {
        let (dir, runner) = project("build: [unclosed", "exit 0");
        let ctx = context(dir.path(), runner);

        let error = pick_job(&ctx, &FixedPicker("1")).unwrap_err();
        assert!(matches!(error, CiLocalError::Parse(_)));
        assert!(!error.is_warning());
    }

    #[test]
    fn test_commands_without_workspace() {
        let ctx = CommandContext::new(
            Workspace::new(vec![]),
            Config::default(),
            Arc::new(StatusTracker::new()),
        );
        assert!(matches!(refresh_job_tree(&ctx), Err(CiLocalError::NoWorkspace)));
    }

    #[tokio::test]
    async fn test_refresh_job_tree_notifies_subscribers() {
        let (dir, runner) = project(PIPELINE, "exit 0");
        let ctx = context(dir.path(), runner);
        let mut subscriber = ctx.tracker().subscribe();

        let tree = refresh_job_tree(&ctx).unwrap();

        let names: Vec<_> = tree.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["build", "deploy"]);
        let woke = tokio::time::timeout(Duration::from_secs(1), subscriber.changed()).await;
        assert_eq!(woke.ok(), Some(true));
    }

    #[tokio::test]
    async fn test_run_job_from_tree() {
        let (dir, runner) = project(PIPELINE, "exit 0");
        let ctx = context(dir.path(), runner);
        let tree = refresh_job_tree(&ctx).unwrap();

        let outcome = run_job_from_tree(&ctx, &tree, "2").await.unwrap();
        assert_eq!(outcome.invocation, Invocation::Job("deploy".into()));
        assert_eq!(ctx.tracker().get("deploy"), Some(JobStatus::Succeeded));

        let missing = run_job_from_tree(&ctx, &tree, "notes").await;
        assert!(matches!(missing, Err(CiLocalError::UnknownJob(name)) if name == "notes"));
    }
}
