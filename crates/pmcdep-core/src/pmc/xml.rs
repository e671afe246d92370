//! PMC bulk submission XML (`bulk_meta.xml`) generation.
//!
//! Emits the minimal metadata document the PMC bulk-submission DTD
//! (`manuscript-bulk.dtd`) accepts: a `manuscript-submit` root carrying
//! agency, embargo, and DOI attributes, with journal, title, contact and
//! grant children. Element and attribute naming must match the DTD exactly,
//! since the archive is validated downstream.
//!
//! Two business rules are enforced here rather than in schema validation:
//! the manifest must name at least one reviewer-type author (the contact
//! person), and every grant funder must belong to [`KNOWN_FUNDERS`].

use crate::models::{DepositManifest, KNOWN_FUNDERS};

/// Metadata generation failure. Input problems, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("At least one author must be a reviewer contact")]
    MissingReviewer,

    #[error("Invalid funder: {0}")]
    InvalidFunder(String),
}

/// Render `bulk_meta.xml` for a validated manifest.
pub fn metadata_xml(manifest: &DepositManifest) -> Result<String, MetadataError> {
    let reviewer = manifest.reviewer().ok_or(MetadataError::MissingReviewer)?;

    for grant in &manifest.metadata.grants {
        if !KNOWN_FUNDERS.contains(&grant.funder.as_str()) {
            return Err(MetadataError::InvalidFunder(grant.funder.clone()));
        }
    }

    let meta = &manifest.metadata;
    let mut xml = String::with_capacity(1024);
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str("<!DOCTYPE manuscript-submit SYSTEM \"manuscript-bulk.dtd\">\n");

    xml.push_str(&format!(
        "<manuscript-submit agency=\"{}\" embargo-months=\"0\"",
        escape(&manifest.agency)
    ));
    if let Some(doi_url) = manifest.doi_url() {
        xml.push_str(&format!(" doi=\"{}\"", escape(&doi_url)));
    }
    xml.push_str(">\n");

    xml.push_str(&format!(
        "  <journal-meta><issn issn-type=\"{}\">{}</issn><journal-title>{}</journal-title></journal-meta>\n",
        meta.journal.issn_type,
        escape(&meta.journal.issn),
        escape(&meta.journal.title)
    ));

    xml.push_str(&format!(
        "  <manuscript-title>{}</manuscript-title>\n",
        escape(&meta.title)
    ));

    xml.push_str("  <contacts><person person-type=\"reviewer\"");
    xml.push_str(&format!(" fname=\"{}\"", escape(&reviewer.fname)));
    if let Some(mname) = &reviewer.mname {
        xml.push_str(&format!(" mname=\"{}\"", escape(mname)));
    }
    xml.push_str(&format!(
        " lname=\"{}\" email=\"{}\"/></contacts>\n",
        escape(&reviewer.lname),
        escape(&reviewer.email)
    ));

    if meta.grants.is_empty() {
        xml.push_str("  <grants/>\n");
    } else {
        xml.push_str("  <grants>");
        for grant in &meta.grants {
            xml.push_str(&format!("<grant funder=\"{}\"", escape(&grant.funder)));
            if let Some(id) = &grant.id {
                xml.push_str(&format!(" id=\"{}\"", escape(id)));
            }
            xml.push_str("/>");
        }
        xml.push_str("</grants>\n");
    }

    xml.push_str("</manuscript-submit>\n");
    Ok(xml)
}

/// Escape text for use in XML content and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
