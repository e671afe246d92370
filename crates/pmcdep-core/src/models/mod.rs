//! Domain models

pub mod manifest;

pub use manifest::{
    Author, ContactType, DepositManifest, FileEntry, FileKind, FileStorage, Grant, IssnType,
    JournalMeta, ManuscriptMeta, KNOWN_FUNDERS,
};
