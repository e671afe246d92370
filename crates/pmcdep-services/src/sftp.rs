use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use pmcdep_core::{DepositError, SftpConfig};
use ssh2::Session;

/// Destination for finished deposit archives.
#[async_trait]
pub trait DepositTransport: Send + Sync {
    /// Upload the file at `local` as `remote_dir/remote_name`, creating
    /// `remote_dir` if needed.
    async fn upload(
        &self,
        local: &Path,
        remote_dir: &str,
        remote_name: &str,
    ) -> Result<(), DepositError>;
}

/// Remote directory for a deposit uploaded on `date`, e.g.
/// `upload/2026-08-29`.
pub fn remote_dir_for_date(date: NaiveDate) -> String {
    format!("upload/{}", date.format("%Y-%m-%d"))
}

/// Uploads archives over SFTP with password authentication. A fresh
/// session is opened per upload and closed before returning.
pub struct SftpTransport {
    config: SftpConfig,
}

impl SftpTransport {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DepositTransport for SftpTransport {
    async fn upload(
        &self,
        local: &Path,
        remote_dir: &str,
        remote_name: &str,
    ) -> Result<(), DepositError> {
        let config = self.config.clone();
        let local = local.to_path_buf();
        let remote_dir = remote_dir.to_string();
        let remote_name = remote_name.to_string();

        // ssh2 is synchronous, so the whole transfer runs on the
        // blocking pool.
        tokio::task::spawn_blocking(move || {
            upload_blocking(&config, &local, &remote_dir, &remote_name)
        })
        .await
        .map_err(|err| DepositError::Internal(format!("upload task panicked: {err}")))?
    }
}

fn upload_blocking(
    config: &SftpConfig,
    local: &Path,
    remote_dir: &str,
    remote_name: &str,
) -> Result<(), DepositError> {
    let addr = format!("{}:{}", config.host, config.port);
    let stream = TcpStream::connect(&addr)
        .map_err(|err| DepositError::Upload(format!("Unable to connect to {addr}: {err}")))?;

    let mut session = Session::new().map_err(upload_err)?;
    session.set_tcp_stream(stream);
    session.handshake().map_err(upload_err)?;
    session
        .userauth_password(&config.username, &config.password)
        .map_err(|err| DepositError::Upload(format!("Authentication failed: {err}")))?;

    let sftp = session.sftp().map_err(upload_err)?;

    let result = transfer(&sftp, local, remote_dir, remote_name);

    // Close explicitly on success and failure; a close error only
    // surfaces when the transfer itself went through.
    let closed = session.disconnect(None, "deposit upload complete", None);
    let remote_path = result?;
    closed.map_err(upload_err)?;

    tracing::info!(
        remote = %remote_path.display(),
        "uploaded deposit archive"
    );
    Ok(())
}

fn transfer(
    sftp: &ssh2::Sftp,
    local: &Path,
    remote_dir: &str,
    remote_name: &str,
) -> Result<PathBuf, DepositError> {
    let dir = PathBuf::from(remote_dir);
    if sftp.stat(&dir).is_err() {
        // A concurrent deposit may create the directory between the stat
        // and the mkdir, so a failed mkdir is only fatal if the
        // directory still does not exist.
        if let Err(err) = sftp.mkdir(&dir, 0o755) {
            if sftp.stat(&dir).is_err() {
                return Err(DepositError::Upload(format!(
                    "Unable to create remote directory {remote_dir}: {err}"
                )));
            }
        }
    }

    let remote_path = dir.join(remote_name);
    let mut remote_file = sftp.create(&remote_path).map_err(|err| {
        DepositError::Upload(format!(
            "Unable to create remote file {}: {err}",
            remote_path.display()
        ))
    })?;

    let mut local_file = std::fs::File::open(local)
        .map_err(|err| DepositError::Upload(format!("Unable to open {}: {err}", local.display())))?;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = local_file.read(&mut buf).map_err(upload_err)?;
        if n == 0 {
            break;
        }
        remote_file.write_all(&buf[..n]).map_err(upload_err)?;
    }

    Ok(remote_path)
}

fn upload_err(err: impl std::fmt::Display) -> DepositError {
    DepositError::Upload(err.to_string())
}
