//! Manifest validation.
//!
//! Explicit field-by-field validation of untyped JSON into a
//! [`DepositManifest`]. Errors carry the offending field path joined with
//! `" - "` (e.g. `metadata - journal - title is required`) so operators can
//! see exactly what to fix. Collects every error in one pass instead of
//! stopping at the first.
//!
//! No filesystem or network access happens here.

use serde_json::Value;

use crate::models::DepositManifest;

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// `" - "`-joined path to the offending field (array indices included).
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: &[String], message: impl Into<String>) -> Self {
        FieldError {
            path: path.join(" - "),
            message: message.into(),
        }
    }

    /// `<path> <message>` as shown to operators.
    pub fn describe(&self) -> String {
        format!("{} {}", self.path, self.message)
    }
}

/// Manifest failed schema checks. Holds every field error found.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid manifest: {}", self.describe_all())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn describe_all(&self) -> String {
        self.errors
            .iter()
            .map(FieldError::describe)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

const FILE_KINDS: &[&str] = &["manuscript", "figure", "table", "supplement"];
const STORAGE_KINDS: &[&str] = &["local", "bucket"];
const ISSN_TYPES: &[&str] = &["print", "electronic", "linking"];
const CONTACT_TYPES: &[&str] = &["author", "reviewer"];

/// Validate raw decoded JSON against the deposit manifest contract.
///
/// `default_agency` fills the `agency` field when the input omits it.
pub fn validate_manifest(
    value: &Value,
    default_agency: &str,
) -> Result<DepositManifest, ValidationError> {
    let mut errors = Vec::new();
    let path: Vec<String> = Vec::new();

    if !value.is_object() {
        errors.push(FieldError::new(
            &["manifest".to_string()],
            "must be a JSON object",
        ));
        return Err(ValidationError { errors });
    }

    check_required_string(value, &path, "taskId", &mut errors);
    check_optional_string(value, &path, "agency", &mut errors);
    check_optional_string(value, &path, "doi", &mut errors);

    match value.get("files").and_then(Value::as_array) {
        Some(files) if !files.is_empty() => {
            for (i, file) in files.iter().enumerate() {
                let file_path = push(&path, "files", Some(i));
                check_required_string(file, &file_path, "filename", &mut errors);
                check_filename(file, &file_path, "filename", &mut errors);
                check_enum(file, &file_path, "type", FILE_KINDS, &mut errors);
                check_required_string(file, &file_path, "label", &mut errors);
                check_optional_enum(file, &file_path, "storage", STORAGE_KINDS, &mut errors);
                check_required_string(file, &file_path, "path", &mut errors);
                check_optional_string(file, &file_path, "contentType", &mut errors);
            }
        }
        Some(_) => errors.push(FieldError::new(
            &push_key(&path, "files"),
            "must contain at least one file",
        )),
        None => errors.push(FieldError::new(&push_key(&path, "files"), "is required")),
    }

    match value.get("metadata") {
        Some(metadata) if metadata.is_object() => {
            let meta_path = push_key(&path, "metadata");
            check_required_string(metadata, &meta_path, "title", &mut errors);

            match metadata.get("journal") {
                Some(journal) if journal.is_object() => {
                    let journal_path = push_key(&meta_path, "journal");
                    check_required_string(journal, &journal_path, "issn", &mut errors);
                    check_enum(journal, &journal_path, "issnType", ISSN_TYPES, &mut errors);
                    check_required_string(journal, &journal_path, "title", &mut errors);
                    check_optional_string(journal, &journal_path, "shortTitle", &mut errors);
                }
                _ => errors.push(FieldError::new(
                    &push_key(&meta_path, "journal"),
                    "is required",
                )),
            }

            match metadata.get("authors").and_then(Value::as_array) {
                Some(authors) if !authors.is_empty() => {
                    for (i, author) in authors.iter().enumerate() {
                        let author_path = push(&meta_path, "authors", Some(i));
                        check_required_string(author, &author_path, "fname", &mut errors);
                        check_optional_string(author, &author_path, "mname", &mut errors);
                        check_required_string(author, &author_path, "lname", &mut errors);
                        check_email(author, &author_path, "email", &mut errors);
                        check_enum(
                            author,
                            &author_path,
                            "contactType",
                            CONTACT_TYPES,
                            &mut errors,
                        );
                    }
                }
                Some(_) => errors.push(FieldError::new(
                    &push_key(&meta_path, "authors"),
                    "must contain at least one author",
                )),
                None => errors.push(FieldError::new(
                    &push_key(&meta_path, "authors"),
                    "is required",
                )),
            }

            match metadata.get("grants").and_then(Value::as_array) {
                Some(grants) => {
                    for (i, grant) in grants.iter().enumerate() {
                        let grant_path = push(&meta_path, "grants", Some(i));
                        check_required_string(grant, &grant_path, "funder", &mut errors);
                        check_optional_string(grant, &grant_path, "id", &mut errors);
                    }
                }
                None => errors.push(FieldError::new(
                    &push_key(&meta_path, "grants"),
                    "is required",
                )),
            }
        }
        _ => errors.push(FieldError::new(&push_key(&path, "metadata"), "is required")),
    }

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    // Structure verified above; deserialization failures here would mean the
    // checks and the model drifted apart.
    let mut manifest: DepositManifest =
        serde_json::from_value(value.clone()).map_err(|e| ValidationError {
            errors: vec![FieldError::new(
                &["manifest".to_string()],
                format!("failed to decode: {}", e),
            )],
        })?;

    if manifest.agency.is_empty() {
        manifest.agency = default_agency.to_string();
    }

    Ok(manifest)
}

fn push(path: &[String], key: &str, index: Option<usize>) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(key.to_string());
    if let Some(i) = index {
        next.push(i.to_string());
    }
    next
}

fn push_key(path: &[String], key: &str) -> Vec<String> {
    push(path, key, None)
}

fn check_required_string(
    value: &Value,
    path: &[String],
    key: &str,
    errors: &mut Vec<FieldError>,
) {
    let field_path = push_key(path, key);
    match value.get(key) {
        None | Some(Value::Null) => errors.push(FieldError::new(&field_path, "is required")),
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(FieldError::new(&field_path, "must not be empty"))
        }
        Some(Value::String(_)) => {}
        Some(_) => errors.push(FieldError::new(&field_path, "must be a string")),
    }
}

fn check_optional_string(value: &Value, path: &[String], key: &str, errors: &mut Vec<FieldError>) {
    match value.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => errors.push(FieldError::new(&push_key(path, key), "must be a string")),
    }
}

fn check_enum(
    value: &Value,
    path: &[String],
    key: &str,
    allowed: &[&str],
    errors: &mut Vec<FieldError>,
) {
    let field_path = push_key(path, key);
    match value.get(key).and_then(Value::as_str) {
        Some(s) if allowed.contains(&s) => {}
        Some(s) => errors.push(FieldError::new(
            &field_path,
            format!("must be one of {} (got '{}')", allowed.join(", "), s),
        )),
        None => errors.push(FieldError::new(&field_path, "is required")),
    }
}

fn check_optional_enum(
    value: &Value,
    path: &[String],
    key: &str,
    allowed: &[&str],
    errors: &mut Vec<FieldError>,
) {
    if matches!(value.get(key), None | Some(Value::Null)) {
        return;
    }
    check_enum(value, path, key, allowed, errors);
}

/// Filenames become archive entries and workspace paths, so anything
/// that is not a bare file name is rejected up front.
fn check_filename(value: &Value, path: &[String], key: &str, errors: &mut Vec<FieldError>) {
    match value.get(key).and_then(Value::as_str) {
        Some(s) if s.contains('/') || s.contains('\\') || s == "." || s == ".." => {
            errors.push(FieldError::new(
                &push_key(path, key),
                "must be a plain file name without path separators",
            ))
        }
        _ => {}
    }
}

fn check_email(value: &Value, path: &[String], key: &str, errors: &mut Vec<FieldError>) {
    let field_path = push_key(path, key);
    match value.get(key).and_then(Value::as_str) {
        Some(s) if s.contains('@') && !s.starts_with('@') && !s.ends_with('@') => {}
        Some(_) => errors.push(FieldError::new(&field_path, "must be a valid email")),
        None => errors.push(FieldError::new(&field_path, "is required")),
    }
}
