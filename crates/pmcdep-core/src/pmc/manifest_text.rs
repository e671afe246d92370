//! PMC package manifest (`manifest.txt`) generation.
//!
//! Tab-delimited, one record per line:
//!
//! ```text
//! bulksub_meta_xml<TAB>bulk_meta.xml
//! manuscript<TAB><filename>                 (exactly one manuscript)
//! manuscript<TAB><label><TAB><filename>     (per manuscript, when two or more)
//! <type><TAB><label><TAB><filename>         (per non-manuscript file)
//! ```
//!
//! The label column differentiates files of the same type, so it is omitted
//! only in the single-manuscript case. Manifest order is preserved:
//! manuscripts first, then the rest.

use crate::models::DepositManifest;
use crate::pmc::BULK_META_XML;

/// Render the tab-delimited package manifest.
pub fn manifest_text(manifest: &DepositManifest) -> String {
    let mut text = format!("bulksub_meta_xml\t{}\n", BULK_META_XML);

    let manuscripts: Vec<_> = manifest.manuscripts().collect();
    if manuscripts.len() == 1 {
        text.push_str(&format!("manuscript\t{}\n", manuscripts[0].filename));
    } else {
        for file in &manuscripts {
            text.push_str(&format!("manuscript\t{}\t{}\n", file.label, file.filename));
        }
    }

    for file in manifest.supporting_files() {
        text.push_str(&format!("{}\t{}\t{}\n", file.kind, file.label, file.filename));
    }

    text
}
