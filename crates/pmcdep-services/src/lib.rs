pub mod archive;
pub mod pipeline;
pub mod sftp;
pub mod tracker;

pub use archive::create_deposit_archive;
pub use pipeline::{BuildOptions, DepositPipeline, DepositReceipt};
pub use sftp::{remote_dir_for_date, DepositTransport, SftpTransport};
pub use tracker::{Callbacks, HttpJobTracker, JobTracker, NoopTracker};
