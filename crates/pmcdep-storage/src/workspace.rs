use std::path::{Path, PathBuf};
use std::time::Duration;

use pmcdep_core::DepositError;
use tokio::fs;
use uuid::Uuid;

/// Siblings of a live workspace are only reclaimed once they are this
/// old. A healthy run removes its own directory, so anything older is
/// debris from a crashed process, not a concurrent deposit.
const STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Scratch directory holding the files of a single deposit while it is
/// being assembled.
///
/// Each invocation gets its own uniquely-named directory, so concurrent
/// redeliveries of the same task never share state. The task id stays in
/// the name so crashed runs can be identified and reclaimed later.
pub struct ScratchWorkspace {
    root: PathBuf,
}

impl ScratchWorkspace {
    /// Create a fresh workspace for `task_id` under the system temp dir
    /// and reclaim debris left behind by crashed runs of the same task.
    pub async fn create(task_id: &str) -> Result<Self, DepositError> {
        let base = std::env::temp_dir();
        let prefix = format!("pmc-deposit-{task_id}-");
        reclaim_stale(&base, &prefix, STALE_AFTER).await;

        let root = base.join(format!("{prefix}{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Create a clean workspace rooted at an explicit path, replacing
    /// whatever is already there. CLI builds use this for the persisted
    /// deposit folder, whose location is fixed by the task id.
    pub async fn create_at(root: PathBuf) -> Result<Self, DepositError> {
        if fs::metadata(&root).await.is_ok() {
            fs::remove_dir_all(&root).await?;
        }
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the on-disk path for a deposit entry, rejecting names that
    /// would escape the workspace.
    pub fn entry_path(&self, filename: &str) -> Result<PathBuf, DepositError> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename == "."
            || filename == ".."
        {
            return Err(DepositError::Internal(format!(
                "Invalid deposit filename: {filename}"
            )));
        }
        Ok(self.root.join(filename))
    }

    /// Sibling path next to the workspace for the packed archive. Shares
    /// the workspace's unique name, so concurrent deposits of the same
    /// task never write the same archive file.
    pub fn archive_path(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("pmc-deposit");
        self.root.with_file_name(format!("{name}.tar.gz"))
    }

    /// Remove the workspace and everything in it. Failures are logged
    /// rather than surfaced, so cleanup never masks a pipeline error.
    pub async fn remove(&self) {
        if fs::metadata(&self.root).await.is_err() {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.root).await {
            tracing::warn!(
                path = %self.root.display(),
                error = %err,
                "failed to remove scratch workspace"
            );
        }
    }
}

/// Remove directories under `base` whose name starts with `prefix` and
/// whose last modification is older than `older_than`. Best-effort; a
/// directory that cannot be removed is left for the next run.
async fn reclaim_stale(base: &Path, prefix: &str, older_than: Duration) {
    let Ok(mut entries) = fs::read_dir(base).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let is_stale = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified
                .elapsed()
                .map(|age| age >= older_than)
                .unwrap_or(false),
            Err(_) => false,
        };
        if !is_stale {
            continue;
        }
        tracing::info!(path = %entry.path().display(), "reclaiming stale deposit workspace");
        if let Err(err) = fs::remove_dir_all(entry.path()).await {
            tracing::warn!(
                path = %entry.path().display(),
                error = %err,
                "failed to reclaim stale workspace"
            );
        }
    }
}
