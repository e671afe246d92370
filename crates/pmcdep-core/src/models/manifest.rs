//! Deposit manifest model.
//!
//! A `DepositManifest` is the validated input of the deposit pipeline. It is
//! constructed once per request through [`crate::validation::validate_manifest`]
//! and immutable afterwards. Serde field names follow the submitting side's
//! JSON (camelCase).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Closed set of funder codes PMC accepts for `<grant funder="...">`.
///
/// Shared by schema validation and XML generation so the two cannot drift.
pub const KNOWN_FUNDERS: &[&str] = &[
    "nih", "ahrq", "aspr", "cdc", "epa", "fda", "hhmi", "nasa", "nist", "va",
];

/// File role inside the deposit package. The literal form is what ends up in
/// the first column of `manifest.txt`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Manuscript,
    Figure,
    Table,
    Supplement,
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileKind::Manuscript => write!(f, "manuscript"),
            FileKind::Figure => write!(f, "figure"),
            FileKind::Table => write!(f, "table"),
            FileKind::Supplement => write!(f, "supplement"),
        }
    }
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manuscript" => Ok(FileKind::Manuscript),
            "figure" => Ok(FileKind::Figure),
            "table" => Ok(FileKind::Table),
            "supplement" => Ok(FileKind::Supplement),
            _ => Err(anyhow::anyhow!("Invalid file type: {}", s)),
        }
    }
}

/// Where the file content lives before acquisition.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStorage {
    /// Already on local disk; `path` is a directory relative to the
    /// configured local storage base.
    Local,
    /// Remote object storage; `path` is a fetchable HTTP(S) URL.
    #[default]
    Bucket,
}

impl Display for FileStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStorage::Local => write!(f, "local"),
            FileStorage::Bucket => write!(f, "bucket"),
        }
    }
}

/// ISSN type for `<issn issn-type="...">`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssnType {
    Print,
    Electronic,
    Linking,
}

impl Display for IssnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IssnType::Print => write!(f, "print"),
            IssnType::Electronic => write!(f, "electronic"),
            IssnType::Linking => write!(f, "linking"),
        }
    }
}

impl FromStr for IssnType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "print" => Ok(IssnType::Print),
            "electronic" => Ok(IssnType::Electronic),
            "linking" => Ok(IssnType::Linking),
            _ => Err(anyhow::anyhow!("Invalid ISSN type: {}", s)),
        }
    }
}

/// How an author relates to the submission. PMC requires at least one
/// `reviewer` contact; this is enforced at XML generation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Author,
    Reviewer,
}

impl Display for ContactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContactType::Author => write!(f, "author"),
            ContactType::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// One file referenced by the deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub label: String,
    #[serde(default)]
    pub storage: FileStorage,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Journal identification for `journal-meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalMeta {
    pub issn: String,
    pub issn_type: IssnType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub fname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mname: Option<String>,
    pub lname: String,
    pub email: String,
    pub contact_type: ContactType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub funder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Manuscript metadata feeding `bulk_meta.xml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManuscriptMeta {
    pub title: String,
    pub journal: JournalMeta,
    pub authors: Vec<Author>,
    pub grants: Vec<Grant>,
}

/// Validated deposit manifest. Construct via
/// [`crate::validation::validate_manifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositManifest {
    pub task_id: String,
    #[serde(default)]
    pub agency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub files: Vec<FileEntry>,
    pub metadata: ManuscriptMeta,
}

impl DepositManifest {
    /// Manuscript-type files in manifest order.
    pub fn manuscripts(&self) -> impl Iterator<Item = &FileEntry> {
        self.files
            .iter()
            .filter(|f| f.kind == FileKind::Manuscript)
    }

    /// Non-manuscript files in manifest order.
    pub fn supporting_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files
            .iter()
            .filter(|f| f.kind != FileKind::Manuscript)
    }

    /// First reviewer-type author, if any. PMC requires one as the
    /// submission contact person.
    pub fn reviewer(&self) -> Option<&Author> {
        self.metadata
            .authors
            .iter()
            .find(|a| a.contact_type == ContactType::Reviewer)
    }

    /// Archive filename for this deposit (`<task_id>.tar.gz`).
    pub fn archive_name(&self) -> String {
        format!("{}.tar.gz", self.task_id)
    }

    /// DOI normalized into a resolvable URL, when present.
    pub fn doi_url(&self) -> Option<String> {
        let doi = self.doi.as_deref()?.trim();
        if doi.is_empty() {
            return None;
        }
        if doi.starts_with("http://") || doi.starts_with("https://") {
            return Some(doi.to_string());
        }
        let bare = doi.strip_prefix("doi:").unwrap_or(doi);
        Some(format!("https://doi.org/{}", bare))
    }
}
