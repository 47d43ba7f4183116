//! Versioned document snapshots, backed by the `git` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{GraphError, Result};
use crate::graph::Graph;

/// Commits files and produces unified diffs.
pub trait VersionControl {
    /// Stage `file_name` inside `repo` (initialising it if needed) and commit.
    fn commit_file(&self, repo: &Path, file_name: &str, message: &str) -> Result<()>;

    /// Newest-first revision ids touching `file_name`, at most `limit`.
    fn history(&self, repo: &Path, file_name: &str, limit: usize) -> Result<Vec<String>>;

    /// Diff of `file_name` between two revisions.
    fn diff_revisions(&self, repo: &Path, from: &str, to: &str, file_name: &str) -> Result<String>;

    /// Diff of two standalone files.
    fn diff_files(&self, a: &Path, b: &Path) -> Result<String>;
}

/// Shells out to `git`.
#[derive(Debug, Clone, Default)]
pub struct Git;

impl Git {
    fn run(&self, repo: Option<&Path>, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new("git");
        if let Some(dir) = repo {
            cmd.arg("-C").arg(dir);
        }
        tracing::debug!(args = ?args, "running git");
        cmd.args(args)
            .output()
            .map_err(|e| GraphError::VersionControl(format!("failed to run git: {}", e)))
    }

    fn run_ok(&self, repo: Option<&Path>, args: &[&str]) -> Result<String> {
        let output = self.run(repo, args)?;
        if !output.status.success() {
            return Err(GraphError::VersionControl(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for Git {
    fn commit_file(&self, repo: &Path, file_name: &str, message: &str) -> Result<()> {
        if !repo.join(".git").exists() {
            self.run_ok(Some(repo), &["init"])?;
        }
        self.run_ok(Some(repo), &["add", file_name])?;
        self.run_ok(Some(repo), &["commit", "-m", message])?;
        Ok(())
    }

    fn history(&self, repo: &Path, file_name: &str, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let out = self.run_ok(
            Some(repo),
            &["log", "-n", limit.as_str(), "--pretty=format:%H", "--", file_name],
        )?;
        Ok(out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }

    fn diff_revisions(&self, repo: &Path, from: &str, to: &str, file_name: &str) -> Result<String> {
        let out = self.run_ok(Some(repo), &["diff", from, to, "--", file_name])?;
        Ok(out.trim().to_string())
    }

    fn diff_files(&self, a: &Path, b: &Path) -> Result<String> {
        let (a, b) = (a.to_string_lossy(), b.to_string_lossy());
        let output = self.run(None, &["diff", "--no-index", a.as_ref(), b.as_ref()])?;
        // exit status 1 just means the files differ
        match output.status.code() {
            Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            _ => Err(GraphError::VersionControl(format!(
                "git diff failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

/// `<id>_doc.md`, the tracked file for a node.
pub fn doc_file_name(id: &str) -> String {
    format!("{}_doc.md", id)
}

/// Write the node's response into `repo` and commit it.
pub fn save_doc_version(graph: &Graph, vcs: &dyn VersionControl, id: &str, repo: &Path) -> Result<PathBuf> {
    let node = graph.node(id)?;
    fs::create_dir_all(repo)?;
    let file_name = doc_file_name(id);
    let path = repo.join(&file_name);
    fs::write(&path, &node.response)?;

    vcs.commit_file(repo, &file_name, &format!("Save version of {}", file_name))?;
    tracing::info!(id, path = %path.display(), "committed document version");
    Ok(path)
}

/// Unified diff between the last two committed versions of a node's document.
pub fn diff_doc_versions(graph: &Graph, vcs: &dyn VersionControl, id: &str, repo: &Path) -> Result<String> {
    graph.node(id)?;
    if !repo.join(".git").exists() {
        return Err(GraphError::VersionControl(format!(
            "{} is not a git repository",
            repo.display()
        )));
    }
    let file_name = doc_file_name(id);
    let revisions = vcs.history(repo, &file_name, 2)?;
    match revisions.as_slice() {
        [newer, older] => vcs.diff_revisions(repo, older, newer, &file_name),
        _ => Err(GraphError::VersionControl(format!(
            "not enough commits of {} to diff",
            file_name
        ))),
    }
}

/// Unified diff between the responses of two nodes.
pub fn diff_docs(graph: &Graph, vcs: &dyn VersionControl, first: &str, second: &str) -> Result<String> {
    let a = graph.node(first)?;
    let b = graph.node(second)?;

    let dir = tempfile::Builder::new().prefix("conch-diff-").tempdir()?;
    let path_a = dir.path().join(doc_file_name(first));
    let path_b = dir.path().join(doc_file_name(second));
    fs::write(&path_a, &a.response)?;
    fs::write(&path_b, &b.response)?;

    vcs.diff_files(&path_a, &path_b)
}
