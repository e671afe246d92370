use std::fs::File;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use pmcdep_core::DepositError;

/// Pack every regular file in `src_dir` into a gzip-compressed tar at
/// `out_path`. Entries sit at the archive root under their bare
/// filenames, in lexicographic order.
///
/// Tar and gzip are blocking, so the whole build runs on the blocking
/// thread pool. File contents are streamed from disk, never buffered in
/// memory.
pub async fn create_deposit_archive(
    src_dir: PathBuf,
    out_path: PathBuf,
) -> Result<(), DepositError> {
    tokio::task::spawn_blocking(move || build_archive(&src_dir, &out_path))
        .await
        .map_err(|err| DepositError::Internal(format!("archive task panicked: {err}")))?
}

fn build_archive(src_dir: &std::path::Path, out_path: &std::path::Path) -> Result<(), DepositError> {
    let file = File::create(out_path).map_err(|err| DepositError::Archive(err.to_string()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut entries = Vec::new();
    let dir = std::fs::read_dir(src_dir).map_err(|err| DepositError::Archive(err.to_string()))?;
    for entry in dir {
        let entry = entry.map_err(|err| DepositError::Archive(err.to_string()))?;
        let path = entry.path();
        if path.is_file() {
            entries.push(path);
        }
    }
    entries.sort();

    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        builder
            .append_path_with_name(&path, &name)
            .map_err(|err| DepositError::Archive(format!("{name}: {err}")))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|err| DepositError::Archive(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| DepositError::Archive(err.to_string()))?;
    Ok(())
}
