use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use pmcdep_core::pmc::{BULK_META_XML, MANIFEST_TXT};
use pmcdep_core::{manifest_text, metadata_xml, Config, DepositError, DepositManifest};
use pmcdep_storage::{FileAcquirer, FileFetcher, ScratchWorkspace};
use serde::Serialize;

use crate::archive::create_deposit_archive;
use crate::sftp::{remote_dir_for_date, DepositTransport};
use crate::tracker::JobTracker;

/// Summary of a delivered deposit, reported back through the tracker.
#[derive(Clone, Debug, Serialize)]
pub struct DepositReceipt {
    pub archive_name: String,
    pub remote_dir: String,
    pub uploaded_files: Vec<String>,
}

/// Options for a CLI-mode build.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub output_dir: PathBuf,
    pub keep_files: bool,
    pub dtd: Option<PathBuf>,
}

/// Runs a deposit end to end: acquire files, generate PMC metadata,
/// archive, and either upload (service mode) or persist locally (CLI
/// mode). Stage failures surface as [`DepositError`]; scratch state is
/// cleaned up on every path.
pub struct DepositPipeline {
    acquirer: FileAcquirer,
    transport: Arc<dyn DepositTransport>,
}

impl DepositPipeline {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn FileFetcher>,
        transport: Arc<dyn DepositTransport>,
    ) -> Self {
        let acquirer = FileAcquirer::new(fetcher, config.local_storage_path.clone());
        Self {
            acquirer,
            transport,
        }
    }

    /// Service-mode deposit: build the archive in a scratch workspace,
    /// upload it, and report the outcome through `tracker`. The
    /// workspace and the local archive are removed whether the deposit
    /// succeeds or not.
    pub async fn run(
        &self,
        manifest: &DepositManifest,
        tracker: &dyn JobTracker,
    ) -> Result<DepositReceipt, DepositError> {
        let workspace = ScratchWorkspace::create(&manifest.task_id).await?;
        let archive_path = workspace.archive_path();

        let result = self
            .run_stages(manifest, &workspace, &archive_path, tracker)
            .await;

        workspace.remove().await;
        if tokio::fs::metadata(&archive_path).await.is_ok() {
            if let Err(err) = tokio::fs::remove_file(&archive_path).await {
                tracing::warn!(
                    path = %archive_path.display(),
                    error = %err,
                    "failed to remove local archive"
                );
            }
        }

        match &result {
            Ok(receipt) => {
                tracing::info!(
                    task_id = %manifest.task_id,
                    archive = %receipt.archive_name,
                    remote_dir = %receipt.remote_dir,
                    "deposit delivered"
                );
                tracker.completed("Deposit delivered to PMC", receipt).await;
            }
            Err(err) => {
                tracing::error!(
                    task_id = %manifest.task_id,
                    stage = err.stage(),
                    error = %err,
                    "deposit failed"
                );
                tracker.failed(&err.to_string()).await;
            }
        }
        result
    }

    async fn run_stages(
        &self,
        manifest: &DepositManifest,
        workspace: &ScratchWorkspace,
        archive_path: &Path,
        tracker: &dyn JobTracker,
    ) -> Result<DepositReceipt, DepositError> {
        tracker.running("Acquiring deposit files").await;
        self.acquirer.acquire_all(manifest, workspace).await?;

        tracker.running("Generating PMC metadata").await;
        write_artifacts(manifest, workspace).await?;

        tracker.running("Creating deposit archive").await;
        let archive_name = manifest.archive_name();
        create_deposit_archive(workspace.path().to_path_buf(), archive_path.to_path_buf())
            .await?;

        tracker.running("Uploading deposit archive").await;
        let remote_dir = remote_dir_for_date(Utc::now().date_naive());
        self.transport
            .upload(archive_path, &remote_dir, &archive_name)
            .await?;

        Ok(DepositReceipt {
            archive_name,
            remote_dir,
            uploaded_files: archive_contents(manifest),
        })
    }

    /// CLI-mode build: assemble the deposit under
    /// `<output>/pmc/<task_id>/`, tar it to `<output>/pmc/<task_id>.tar.gz`,
    /// and return the archive path. The folder is removed afterwards
    /// unless `keep_files` is set.
    pub async fn build_deposit(
        &self,
        manifest: &DepositManifest,
        opts: &BuildOptions,
    ) -> Result<PathBuf, DepositError> {
        let deposit_dir = opts.output_dir.join("pmc").join(&manifest.task_id);
        let workspace = ScratchWorkspace::create_at(deposit_dir).await?;

        let result = self.build_stages(manifest, &workspace, opts).await;

        if !opts.keep_files || result.is_err() {
            workspace.remove().await;
        }
        result
    }

    async fn build_stages(
        &self,
        manifest: &DepositManifest,
        workspace: &ScratchWorkspace,
        opts: &BuildOptions,
    ) -> Result<PathBuf, DepositError> {
        self.acquirer.acquire_all(manifest, workspace).await?;
        write_artifacts(manifest, workspace).await?;

        if let Some(dtd) = &opts.dtd {
            let xml_path = workspace.entry_path(BULK_META_XML)?;
            validate_with_dtd(&xml_path, dtd).await?;
        }

        let archive_path = opts
            .output_dir
            .join("pmc")
            .join(manifest.archive_name());
        create_deposit_archive(workspace.path().to_path_buf(), archive_path.clone()).await?;
        Ok(archive_path)
    }
}

async fn write_artifacts(
    manifest: &DepositManifest,
    workspace: &ScratchWorkspace,
) -> Result<(), DepositError> {
    let text = manifest_text(manifest);
    let xml = metadata_xml(manifest)?;
    tokio::fs::write(workspace.entry_path(MANIFEST_TXT)?, text).await?;
    tokio::fs::write(workspace.entry_path(BULK_META_XML)?, xml).await?;
    Ok(())
}

fn archive_contents(manifest: &DepositManifest) -> Vec<String> {
    let mut files = vec![MANIFEST_TXT.to_string(), BULK_META_XML.to_string()];
    files.extend(manifest.files.iter().map(|f| f.filename.clone()));
    files
}

/// Validate the generated XML against a DTD with `xmllint`.
async fn validate_with_dtd(xml_path: &Path, dtd: &Path) -> Result<(), DepositError> {
    let output = tokio::process::Command::new("xmllint")
        .arg("--noout")
        .arg("--nowarning")
        .arg("--nonet")
        .arg("--dtdvalid")
        .arg(dtd)
        .arg(xml_path)
        .output()
        .await
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                DepositError::Internal(
                    "xmllint is required for DTD validation but was not found on PATH".to_string(),
                )
            } else {
                DepositError::Internal(format!("Unable to run xmllint: {err}"))
            }
        })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DepositError::Internal(format!(
            "DTD validation failed: {}",
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use flate2::read::GzDecoder;
    use serde_json::json;

    use super::*;

    fn manifest(task_id: &str, path_base: &str) -> DepositManifest {
        serde_json::from_value(json!({
            "taskId": task_id,
            "agency": "hhmi",
            "files": [{
                "filename": "paper.pdf",
                "type": "manuscript",
                "label": "M1",
                "storage": "local",
                "path": path_base
            }],
            "metadata": {
                "title": "A Title",
                "journal": { "issn": "1234-5678", "issnType": "print", "title": "J" },
                "authors": [
                    { "fname": "Ada", "lname": "Lovelace", "email": "ada@example.org",
                      "contactType": "reviewer" }
                ],
                "grants": [{ "funder": "hhmi" }]
            }
        }))
        .unwrap()
    }

    fn config(local_base: &Path) -> Config {
        Config {
            local_storage_path: local_base.to_path_buf(),
            ..Config::default()
        }
    }

    struct UnusedFetcher;

    #[async_trait]
    impl FileFetcher for UnusedFetcher {
        async fn fetch(&self, url: &str, _dest: &Path) -> Result<(), DepositError> {
            Err(DepositError::Acquisition(format!(
                "Unable to download file: {url}"
            )))
        }
    }

    /// Captures archive bytes at upload time, before cleanup deletes the
    /// local file.
    struct CapturingTransport {
        uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl CapturingTransport {
        fn new() -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DepositTransport for CapturingTransport {
        async fn upload(
            &self,
            local: &Path,
            remote_dir: &str,
            remote_name: &str,
        ) -> Result<(), DepositError> {
            let bytes = tokio::fs::read(local).await?;
            self.uploads
                .lock()
                .unwrap()
                .push((remote_dir.to_string(), remote_name.to_string(), bytes));
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl DepositTransport for FailingTransport {
        async fn upload(&self, _: &Path, _: &str, _: &str) -> Result<(), DepositError> {
            Err(DepositError::Upload("connection reset".to_string()))
        }
    }

    /// Leftovers in the system temp dir whose name starts with `prefix`
    /// (workspace dirs and archives share it).
    fn temp_residue(prefix: &str) -> Vec<String> {
        std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.starts_with(prefix))
            .collect()
    }

    fn stage_local_file(base: &Path, rel: &str) {
        let dir = base.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("paper.pdf"), b"pdf bytes").unwrap();
    }

    #[tokio::test]
    async fn minimal_deposit_uploads_three_entry_archive() {
        let base = tempfile::tempdir().unwrap();
        stage_local_file(base.path(), "store");

        let transport = Arc::new(CapturingTransport::new());
        let pipeline = DepositPipeline::new(
            &config(base.path()),
            Arc::new(UnusedFetcher),
            transport.clone(),
        );

        let receipt = pipeline
            .run(&manifest("t1", "store"), &crate::tracker::NoopTracker)
            .await
            .unwrap();

        assert_eq!(receipt.archive_name, "t1.tar.gz");
        assert!(receipt.remote_dir.starts_with("upload/"));
        assert_eq!(
            receipt.uploaded_files,
            vec!["manifest.txt", "bulk_meta.xml", "paper.pdf"]
        );

        let uploads = transport.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (remote_dir, remote_name, bytes) = &uploads[0];
        assert_eq!(remote_dir, &receipt.remote_dir);
        assert_eq!(remote_name, "t1.tar.gz");

        let mut archive = tar::Archive::new(GzDecoder::new(&bytes[..]));
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().into_owned());
            let mut sink = Vec::new();
            entry.read_to_end(&mut sink).unwrap();
        }
        names.sort();
        assert_eq!(names, vec!["bulk_meta.xml", "manifest.txt", "paper.pdf"]);
    }

    #[tokio::test]
    async fn workspace_is_removed_after_upload_failure() {
        let base = tempfile::tempdir().unwrap();
        stage_local_file(base.path(), "store");

        let pipeline = DepositPipeline::new(
            &config(base.path()),
            Arc::new(UnusedFetcher),
            Arc::new(FailingTransport),
        );

        let err = pipeline
            .run(&manifest("t-upload-fail", "store"), &crate::tracker::NoopTracker)
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::Upload(_)));

        assert!(temp_residue("pmc-deposit-t-upload-fail-").is_empty());
    }

    #[tokio::test]
    async fn overlapping_runs_of_same_task_do_not_interfere() {
        let base = tempfile::tempdir().unwrap();
        stage_local_file(base.path(), "store");

        let transport = Arc::new(CapturingTransport::new());
        let pipeline = DepositPipeline::new(
            &config(base.path()),
            Arc::new(UnusedFetcher),
            transport.clone(),
        );

        let manifest = manifest("t-overlap", "store");
        let (first, second) = tokio::join!(
            pipeline.run(&manifest, &crate::tracker::NoopTracker),
            pipeline.run(&manifest, &crate::tracker::NoopTracker),
        );
        first.unwrap();
        second.unwrap();

        let uploads = transport.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        for (_, remote_name, bytes) in uploads.iter() {
            assert_eq!(remote_name, "t-overlap.tar.gz");
            assert!(!bytes.is_empty());
        }
        drop(uploads);

        assert!(temp_residue("pmc-deposit-t-overlap-").is_empty());
    }

    #[tokio::test]
    async fn cli_build_writes_archive_and_removes_folder() {
        let base = tempfile::tempdir().unwrap();
        stage_local_file(base.path(), "store");
        let output = base.path().join("out");

        let pipeline = DepositPipeline::new(
            &config(base.path()),
            Arc::new(UnusedFetcher),
            Arc::new(FailingTransport),
        );

        let opts = BuildOptions {
            output_dir: output.clone(),
            keep_files: false,
            dtd: None,
        };
        let archive_path = pipeline
            .build_deposit(&manifest("t-cli", "store"), &opts)
            .await
            .unwrap();

        assert_eq!(archive_path, output.join("pmc").join("t-cli.tar.gz"));
        assert!(archive_path.exists());
        assert!(!output.join("pmc").join("t-cli").exists());
    }

    #[tokio::test]
    async fn cli_build_keeps_folder_on_request() {
        let base = tempfile::tempdir().unwrap();
        stage_local_file(base.path(), "store");
        let output = base.path().join("out");

        let pipeline = DepositPipeline::new(
            &config(base.path()),
            Arc::new(UnusedFetcher),
            Arc::new(FailingTransport),
        );

        let opts = BuildOptions {
            output_dir: output.clone(),
            keep_files: true,
            dtd: None,
        };
        pipeline
            .build_deposit(&manifest("t-keep", "store"), &opts)
            .await
            .unwrap();

        let folder = output.join("pmc").join("t-keep");
        assert!(folder.join("manifest.txt").exists());
        assert!(folder.join("bulk_meta.xml").exists());
        assert!(folder.join("paper.pdf").exists());
    }
}
