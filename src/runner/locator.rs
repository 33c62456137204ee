use std::path::{Path, PathBuf};

use log::debug;

pub const RUNNER_NAME: &str = "gitlab-ci-local";

/// Picks the runner executable.
///
/// An explicit path wins. Otherwise a project-local npm install under
/// `node_modules/.bin` is preferred, then whatever `gitlab-ci-local` resolves
/// to on `PATH`.
pub fn resolve_executable(explicit: Option<&Path>, project_root: &Path) -> PathBuf {
    if let Some(path) = explicit {
        let path = anchored(path);
        debug!("Using configured runner: {}", path.display());
        return path;
    }

    let local = project_root
        .join("node_modules")
        .join(".bin")
        .join(RUNNER_NAME);
    if local.is_file() {
        debug!("Using project-local runner: {}", local.display());
        return local;
    }

    PathBuf::from(RUNNER_NAME)
}

// The runner is spawned from the CI file's folder. A relative path with a
// directory part is anchored to the current directory first; a bare name is
// left for the `PATH` lookup.
fn anchored(path: &Path) -> PathBuf {
    if path.is_absolute() || path.components().count() < 2 {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
