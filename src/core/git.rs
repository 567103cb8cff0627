use anyhow::{Context, Result};
use git2::{Repository, Status};
use std::path::{Path, PathBuf};

/// Git queries the engine makes before touching a file.
/// Kept behind a trait so the engine also works outside a repository.
pub trait WorkingTree {
    /// Root of the work tree.
    fn root(&self) -> PathBuf;

    /// Whether `path` differs from what is committed (modified, staged or
    /// untracked).
    fn has_uncommitted_changes(&self, path: &Path) -> Result<bool>;
}

/// `WorkingTree` backed by the git2 crate.
pub struct Git2WorkingTree {
    repo: Repository,
}

impl Git2WorkingTree {
    /// Opens the repository containing `path`, if any.
    pub fn discover<P: AsRef<Path>>(path: P) -> Option<Self> {
        let repo = Repository::discover(path).ok()?;
        // Bare repositories have nothing to rewrite.
        repo.workdir()?;
        Some(Self { repo })
    }
}

impl WorkingTree for Git2WorkingTree {
    fn root(&self) -> PathBuf {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.repo.path().to_path_buf())
    }

    fn has_uncommitted_changes(&self, path: &Path) -> Result<bool> {
        let root = canonical(&self.root());
        let path = canonical(path);
        let relative = path
            .strip_prefix(&root)
            .with_context(|| format!("{} is outside the repository", path.display()))?;

        let status = self
            .repo
            .status_file(relative)
            .with_context(|| format!("Failed to read git status of {}", relative.display()))?;

        Ok(status.intersects(
            Status::WT_MODIFIED
                | Status::WT_NEW
                | Status::WT_RENAMED
                | Status::WT_TYPECHANGE
                | Status::INDEX_MODIFIED
                | Status::INDEX_NEW
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The enclosing git work tree of `start`, or `start` itself.
pub fn discover_project_root(start: &Path) -> PathBuf {
    match Git2WorkingTree::discover(start) {
        Some(tree) => {
            let root = tree.root();
            tracing::debug!("Using git work tree {} as project root", root.display());
            root
        }
        None => start.to_path_buf(),
    }
}
