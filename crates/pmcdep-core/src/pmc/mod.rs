//! PMC bulk-submission metadata generation.
//!
//! Pure functions from a validated manifest to the two artifacts every
//! deposit package carries: the tab-delimited `manifest.txt` and the
//! `bulk_meta.xml` metadata document.

pub mod manifest_text;
pub mod xml;

pub use manifest_text::manifest_text;
pub use xml::{metadata_xml, MetadataError};

/// Name of the metadata XML inside the package.
pub const BULK_META_XML: &str = "bulk_meta.xml";
/// Name of the package manifest file.
pub const MANIFEST_TXT: &str = "manifest.txt";
