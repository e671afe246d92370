//! Validation modules

pub mod manifest;

pub use manifest::{validate_manifest, FieldError, ValidationError};
