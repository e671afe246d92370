//! Core types and pure logic for PMC manuscript deposits.
//!
//! This crate holds everything that does not touch the network or the
//! filesystem: the deposit manifest model, manifest validation, PMC
//! metadata generation (manifest text and bulk submission XML), the
//! unified error taxonomy, and environment configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod pmc;
pub mod validation;

pub use config::{Config, SftpConfig};
pub use error::DepositError;
pub use models::{
    Author, ContactType, DepositManifest, FileEntry, FileKind, FileStorage, Grant, IssnType,
    JournalMeta, ManuscriptMeta, KNOWN_FUNDERS,
};
pub use pmc::{manifest_text, metadata_xml, MetadataError};
pub use validation::{validate_manifest, FieldError, ValidationError};
