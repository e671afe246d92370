//! Configuration module
//!
//! One explicit configuration value object, loaded from the environment at
//! process start and passed into the pipeline. Components never read
//! environment variables themselves.

use std::env;
use std::path::PathBuf;

const DEFAULT_SFTP_PORT: u16 = 22;
const DEFAULT_SERVER_PORT: u16 = 3000;
/// Streaming copy buffer for downloads; balances memory use vs throughput.
const DEFAULT_STREAM_BUFFER_KB: usize = 256;
const DEFAULT_OUTPUT_DIR: &str = "deposits";
const DEFAULT_AGENCY: &str = "hhmi";

/// SFTP endpoint credentials for the PMC upload target.
#[derive(Clone, Debug)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub sftp: SftpConfig,
    /// Internal buffer size in KiB for streaming downloads to disk.
    pub stream_buffer_kb: usize,
    /// Output directory for CLI-mode deposits.
    pub output_dir: PathBuf,
    /// Agency code applied when the manifest omits one.
    pub default_agency: String,
    /// Base directory that `storage: local` file paths are relative to.
    pub local_storage_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let sftp = SftpConfig {
            host: env::var("FTP_HOST").unwrap_or_default(),
            port: env::var("FTP_PORT")
                .unwrap_or_else(|_| DEFAULT_SFTP_PORT.to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid FTP_PORT: {}", e))?,
            username: env::var("FTP_USERNAME").unwrap_or_default(),
            password: env::var("FTP_PASSWORD").unwrap_or_default(),
        };

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT: {}", e))?,
            sftp,
            stream_buffer_kb: env::var("STREAM_BUFFER_KB")
                .unwrap_or_else(|_| DEFAULT_STREAM_BUFFER_KB.to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid STREAM_BUFFER_KB: {}", e))?,
            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            default_agency: env::var("DEPOSIT_AGENCY")
                .unwrap_or_else(|_| DEFAULT_AGENCY.to_string()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
        })
    }

    /// Validate settings the service variant cannot run without.
    /// The CLI never uploads, so it skips this.
    pub fn validate_for_service(&self) -> Result<(), anyhow::Error> {
        if self.sftp.host.is_empty() {
            anyhow::bail!("FTP_HOST is required");
        }
        if self.sftp.username.is_empty() {
            anyhow::bail!("FTP_USERNAME is required");
        }
        if self.sftp.password.is_empty() {
            anyhow::bail!("FTP_PASSWORD is required");
        }
        if self.stream_buffer_kb == 0 {
            anyhow::bail!("STREAM_BUFFER_KB must be greater than zero");
        }
        Ok(())
    }

    /// Streaming buffer size in bytes.
    pub fn stream_buffer_bytes(&self) -> usize {
        self.stream_buffer_kb * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_port: DEFAULT_SERVER_PORT,
            sftp: SftpConfig {
                host: String::new(),
                port: DEFAULT_SFTP_PORT,
                username: String::new(),
                password: String::new(),
            },
            stream_buffer_kb: DEFAULT_STREAM_BUFFER_KB,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_agency: DEFAULT_AGENCY.to_string(),
            local_storage_path: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.sftp.port, 22);
        assert_eq!(config.stream_buffer_kb, 256);
        assert_eq!(config.stream_buffer_bytes(), 256 * 1024);
        assert_eq!(config.default_agency, "hhmi");
    }

    #[test]
    fn service_validation_requires_sftp_credentials() {
        let mut config = Config::default();
        assert!(config.validate_for_service().is_err());

        config.sftp.host = "ftp.example.gov".to_string();
        config.sftp.username = "depositor".to_string();
        config.sftp.password = "secret".to_string();
        assert!(config.validate_for_service().is_ok());

        config.stream_buffer_kb = 0;
        assert!(config.validate_for_service().is_err());
    }
}
