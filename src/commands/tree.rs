use serde::Serialize;

use super::picker::find_by_ref;
use crate::pipeline::PipelineDocument;
use crate::status::{JobStatus, StatusTracker};

/// Runnable jobs of a pipeline with their last known status, as shown to the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub stage: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobTree {
    pub fn build(document: &PipelineDocument, tracker: &StatusTracker) -> Self {
        let nodes = document
            .jobs()
            .into_iter()
            .map(|(name, job)| TreeNode {
                stage: job.stage().map(str::to_string),
                status: tracker.get(&name),
                name,
            })
            .collect();
        Self { nodes }
    }

    /// Looks a job up by exact name, `#N` or a bare 1-based position.
    pub fn resolve(&self, job_ref: &str) -> Option<&TreeNode> {
        find_by_ref(&self.nodes, |node| node.name.as_str(), job_ref)
    }

    /// Re-reads statuses from the tracker without touching the pipeline file.
    pub fn refresh_statuses(&mut self, tracker: &StatusTracker) {
        for node in &mut self.nodes {
            node.status = tracker.get(&node.name);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
stages: [build, test]
compile:
  stage: build
  script: make
.hidden:
  script: nope
"42":
  stage: test
  script: make check
notes: "free text"
"#;

    fn tree(tracker: &StatusTracker) -> JobTree {
        JobTree::build(&PipelineDocument::parse(PIPELINE).unwrap(), tracker)
    }

    #[test]
    fn test_build_uses_strict_jobs_in_order() {
        let tracker = StatusTracker::new();
        let tree = tree(&tracker);
        let names: Vec<_> = tree.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["compile", "42"]);
        assert_eq!(tree.nodes[0].stage.as_deref(), Some("build"));
        assert!(tree.nodes.iter().all(|n| n.status.is_none()));
    }

    #[test]
    fn test_build_picks_up_tracker_status() {
        let tracker = StatusTracker::new();
        tracker.set_running("compile");
        let tree = tree(&tracker);
        assert_eq!(tree.nodes[0].status, Some(JobStatus::Running));
        assert_eq!(tree.nodes[1].status, None);
    }

    #[test]
    fn test_resolve_by_name_then_position() {
        let tracker = StatusTracker::new();
        let tree = tree(&tracker);

        assert_eq!(tree.resolve("1").map(|n| n.name.as_str()), Some("compile"));
        assert_eq!(tree.resolve("2").map(|n| n.name.as_str()), Some("42"));
        assert_eq!(tree.resolve("#2").map(|n| n.name.as_str()), Some("42"));
        assert_eq!(tree.resolve("42").map(|n| n.name.as_str()), Some("42"));
        assert!(tree.resolve("#42").is_none());
        assert_eq!(tree.resolve(" compile ").map(|n| n.name.as_str()), Some("compile"));
        assert!(tree.resolve("0").is_none());
        assert!(tree.resolve(".hidden").is_none());
        assert!(tree.resolve("notes").is_none());
    }

    #[test]
    fn test_refresh_statuses() {
        let tracker = StatusTracker::new();
        let mut tree = tree(&tracker);

        tracker.set_running("42");
        tracker.set_result("42", false).unwrap();
        tree.refresh_statuses(&tracker);

        assert_eq!(tree.nodes[1].status, Some(JobStatus::Failed));
    }
}
