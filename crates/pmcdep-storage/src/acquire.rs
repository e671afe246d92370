use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use pmcdep_core::{DepositError, DepositManifest, FileEntry, FileStorage};
use tokio::sync::Semaphore;

use crate::fetcher::FileFetcher;
use crate::workspace::ScratchWorkspace;

/// Upper bound on simultaneous file transfers per deposit.
pub const MAX_CONCURRENT_TRANSFERS: usize = 5;

/// Collects every deposit file into a scratch workspace, copying local
/// entries and downloading bucket entries.
pub struct FileAcquirer {
    fetcher: Arc<dyn FileFetcher>,
    local_base: PathBuf,
}

impl FileAcquirer {
    pub fn new(fetcher: Arc<dyn FileFetcher>, local_base: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            local_base: local_base.into(),
        }
    }

    fn local_path(&self, file: &FileEntry) -> PathBuf {
        self.local_base.join(&file.path).join(&file.filename)
    }

    /// Check that every local-storage entry exists on disk. All missing
    /// files are reported together rather than one at a time.
    pub async fn verify_local(&self, manifest: &DepositManifest) -> Result<(), DepositError> {
        let mut missing = Vec::new();
        for file in &manifest.files {
            if file.storage != FileStorage::Local {
                continue;
            }
            let path = self.local_path(file);
            if tokio::fs::metadata(&path).await.is_err() {
                missing.push(path.display().to_string());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DepositError::MissingFiles(missing))
        }
    }

    /// Bring every manifest file into `workspace`, at most
    /// [`MAX_CONCURRENT_TRANSFERS`] transfers in flight. The first failure
    /// aborts the whole batch.
    pub async fn acquire_all(
        &self,
        manifest: &DepositManifest,
        workspace: &ScratchWorkspace,
    ) -> Result<(), DepositError> {
        self.verify_local(manifest).await?;

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_TRANSFERS));
        let mut tasks = Vec::with_capacity(manifest.files.len());

        for file in &manifest.files {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let dest = workspace.entry_path(&file.filename)?;
            let source = match file.storage {
                FileStorage::Local => AcquireSource::Copy(self.local_path(file)),
                FileStorage::Bucket => AcquireSource::Download(file.path.clone()),
            };
            let filename = file.filename.clone();

            tasks.push(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|err| DepositError::Internal(err.to_string()))?;

                tracing::debug!(filename = %filename, "acquiring deposit file");
                match source {
                    AcquireSource::Copy(from) => {
                        tokio::fs::copy(&from, &dest).await.map_err(|err| {
                            DepositError::Acquisition(format!(
                                "Unable to copy file: {}: {err}",
                                from.display()
                            ))
                        })?;
                    }
                    AcquireSource::Download(url) => {
                        fetcher.fetch(&url, &dest).await?;
                    }
                }
                Ok::<(), DepositError>(())
            });
        }

        try_join_all(tasks).await?;
        Ok(())
    }
}

enum AcquireSource {
    Copy(PathBuf),
    Download(String),
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    fn manifest(files: serde_json::Value) -> DepositManifest {
        serde_json::from_value(json!({
            "taskId": "t1",
            "agency": "hhmi",
            "files": files,
            "metadata": {
                "title": "A Title",
                "journal": { "issn": "1234-5678", "issnType": "print", "title": "J" },
                "authors": [
                    { "fname": "Ada", "lname": "Lovelace", "email": "ada@example.org",
                      "contactType": "reviewer" }
                ],
                "grants": []
            }
        }))
        .unwrap()
    }

    struct RecordingFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordingFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileFetcher for RecordingFetcher {
        async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DepositError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            tokio::fs::write(dest, b"data").await?;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl FileFetcher for FailingFetcher {
        async fn fetch(&self, url: &str, _dest: &Path) -> Result<(), DepositError> {
            Err(DepositError::Acquisition(format!(
                "Unable to download file: {url}"
            )))
        }
    }

    #[tokio::test]
    async fn downloads_are_bounded_at_five_in_flight() {
        let base = tempfile::tempdir().unwrap();
        let ws = ScratchWorkspace::create_at(base.path().join("ws"))
            .await
            .unwrap();

        let files: Vec<serde_json::Value> = (0..12)
            .map(|i| {
                json!({
                    "filename": format!("f{i}.pdf"),
                    "type": "supplement",
                    "label": format!("S{i}"),
                    "storage": "bucket",
                    "path": format!("https://files.example.org/f{i}.pdf")
                })
            })
            .collect();
        let manifest = manifest(json!(files));

        let fetcher = Arc::new(RecordingFetcher::new());
        let acquirer = FileAcquirer::new(fetcher.clone(), base.path());
        acquirer.acquire_all(&manifest, &ws).await.unwrap();

        assert!(fetcher.peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_TRANSFERS);
        for i in 0..12 {
            assert!(ws.path().join(format!("f{i}.pdf")).exists());
        }
    }

    #[tokio::test]
    async fn copies_local_files_into_workspace() {
        let base = tempfile::tempdir().unwrap();
        let src_dir = base.path().join("store").join("task");
        tokio::fs::create_dir_all(&src_dir).await.unwrap();
        tokio::fs::write(src_dir.join("paper.pdf"), b"pdf bytes")
            .await
            .unwrap();

        let ws = ScratchWorkspace::create_at(base.path().join("ws"))
            .await
            .unwrap();
        let manifest = manifest(json!([{
            "filename": "paper.pdf",
            "type": "manuscript",
            "label": "M1",
            "storage": "local",
            "path": "task"
        }]));

        let acquirer = FileAcquirer::new(Arc::new(FailingFetcher), base.path().join("store"));
        acquirer.acquire_all(&manifest, &ws).await.unwrap();

        let copied = tokio::fs::read(ws.path().join("paper.pdf")).await.unwrap();
        assert_eq!(copied, b"pdf bytes");
    }

    #[tokio::test]
    async fn missing_local_files_are_reported_together() {
        let base = tempfile::tempdir().unwrap();
        let manifest = manifest(json!([
            { "filename": "a.pdf", "type": "manuscript", "label": "M1",
              "storage": "local", "path": "task" },
            { "filename": "b.tif", "type": "figure", "label": "F1",
              "storage": "local", "path": "task" }
        ]));

        let acquirer = FileAcquirer::new(Arc::new(FailingFetcher), base.path());
        let err = acquirer.verify_local(&manifest).await.unwrap_err();

        match err {
            DepositError::MissingFiles(paths) => {
                assert_eq!(paths.len(), 2);
                assert!(paths[0].ends_with("a.pdf"));
                assert!(paths[1].ends_with("b.tif"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn first_download_failure_aborts_the_batch() {
        let base = tempfile::tempdir().unwrap();
        let ws = ScratchWorkspace::create_at(base.path().join("ws"))
            .await
            .unwrap();
        let manifest = manifest(json!([{
            "filename": "f.pdf",
            "type": "figure",
            "label": "F1",
            "storage": "bucket",
            "path": "https://files.example.org/f.pdf"
        }]));

        let acquirer = FileAcquirer::new(Arc::new(FailingFetcher), base.path());
        let err = acquirer.acquire_all(&manifest, &ws).await.unwrap_err();
        assert!(matches!(err, DepositError::Acquisition(_)));
    }
}
