//! Structural validation of HIP-412 metadata objects.
//!
//! [`validate`] checks one [`MetadataObject`]; [`validate_many`] checks a
//! whole conversion run and cross-checks declared attribute headers.
//! Validation is pure: problems come back as data, never as `Err`.
//!
//! # Rules
//!
//! | Kind | Violation |
//! |------|-----------|
//! | [`ValidationErrorKind::MissingName`] | `name` absent or blank |
//! | [`ValidationErrorKind::MissingImage`] | `image` absent or blank |
//! | [`ValidationErrorKind::InvalidType`] | `type` absent, not an accepted MIME type, or inconsistent with the image extension |
//! | [`ValidationErrorKind::InvalidProperties`] | `properties` not a mapping, or `external_url` / `url` not strings |
//! | [`ValidationErrorKind::InvalidAttributes`] | `attributes` not an array, or any entry malformed |
//!
//! Shape rules for `type`, `properties` and `attributes` come from the
//! embedded `schemas/hip412.json` (JSON Schema Draft 7).
//!
//! # Example
//!
//! ```rust,ignore
//! use nftmint::{validate, MetadataObject};
//!
//! let object = MetadataObject::new("NFT 1", "https://nft.com/1.jpg", "image/jpeg");
//! assert!(validate(&object).is_valid);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::models::MetadataObject;

static STANDARD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/hip412.json"))
        .expect("Invalid embedded schema")
});

fn definition(name: &str) -> jsonschema::Validator {
    jsonschema::draft7::new(&STANDARD_SCHEMA["definitions"][name])
        .expect("Invalid embedded schema definition")
}

static MIME_TYPE: Lazy<jsonschema::Validator> = Lazy::new(|| definition("mimeType"));
static PROPERTIES: Lazy<jsonschema::Validator> = Lazy::new(|| definition("properties"));
static ATTRIBUTES: Lazy<jsonschema::Validator> = Lazy::new(|| definition("attributes"));
static ATTRIBUTE: Lazy<jsonschema::Validator> = Lazy::new(|| definition("attribute"));

/// Extension of the last path segment, query and fragment removed.
static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^?#]*/)?[^/?#]*\.([A-Za-z0-9]+)(?:[?#].*)?$")
        .expect("Invalid extension pattern")
});

// =============================================================================
// Result types
// =============================================================================

/// One violated rule. The message of each kind is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    MissingName,
    MissingImage,
    InvalidType,
    InvalidProperties,
    /// Also used when `attributes` is present but not an array; the message
    /// reads "missing or invalid" in both cases.
    InvalidAttributes,
}

impl ValidationErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingName => "Required \"name\" field is missing",
            Self::MissingImage => "Required \"image\" field is missing",
            Self::InvalidType => "Required \"type\" field is missing or invalid",
            Self::InvalidProperties => {
                "\"properties\" field must be an object with string \"external_url\" and \"url\" values"
            }
            Self::InvalidAttributes => "Required \"attributes\" field is missing or invalid",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for ValidationErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Errors found on one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    /// One entry per violated rule.
    pub general: Vec<ValidationErrorKind>,
    /// Per-entry detail for malformed `attributes` entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Result of validating one object. Either valid, or `general` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: ValidationErrors,
}

/// Validation errors of the object at `index` in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectValidationError {
    pub index: usize,
    pub errors: ValidationErrors,
}

/// Why a declared attribute has no entry on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCause {
    /// The source row had no cell for the attribute column at all.
    ColumnAbsent,
    /// The column was there but the value was empty.
    EmptyValue,
}

/// A declared attribute header with no value on the object at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAttributeError {
    pub index: usize,
    pub trait_type: String,
    pub cause: MissingCause,
}

impl fmt::Display for MissingAttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause = match self.cause {
            MissingCause::ColumnAbsent => "column absent",
            MissingCause::EmptyValue => "empty value",
        };
        write!(
            f,
            "Object {}: missing attribute \"{}\" ({})",
            self.index, self.trait_type, cause
        )
    }
}

/// Result of [`validate_many`]. Both lists are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidationReport {
    pub metadata_objects_validation_errors: Vec<ObjectValidationError>,
    pub missing_attributes_errors: Vec<MissingAttributeError>,
}

impl BatchValidationReport {
    pub fn is_clean(&self) -> bool {
        self.metadata_objects_validation_errors.is_empty()
            && self.missing_attributes_errors.is_empty()
    }

    /// Fold in diagnostics for attribute columns that were absent from their
    /// rows, so that each `(index, trait_type)` is reported once.
    pub fn merge_absent(&mut self, absent: Vec<MissingAttributeError>) {
        for diagnostic in absent {
            let existing = self
                .missing_attributes_errors
                .iter_mut()
                .find(|e| e.index == diagnostic.index && e.trait_type == diagnostic.trait_type);
            match existing {
                Some(e) => e.cause = MissingCause::ColumnAbsent,
                None => self.missing_attributes_errors.push(diagnostic),
            }
        }
        self.missing_attributes_errors.sort_by_key(|e| e.index);
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate one metadata object.
pub fn validate(object: &MetadataObject) -> ValidationResult {
    let mut errors = ValidationErrors::default();

    if !is_text(&object.name) {
        errors.general.push(ValidationErrorKind::MissingName);
    }
    if !is_text(&object.image) {
        errors.general.push(ValidationErrorKind::MissingImage);
    }
    if !is_valid_type(object.mime_type(), object.image()) {
        errors.general.push(ValidationErrorKind::InvalidType);
    }
    if let Some(properties) = &object.properties {
        if !PROPERTIES.is_valid(properties) {
            errors.general.push(ValidationErrorKind::InvalidProperties);
        }
    }
    if let Some(attributes) = &object.attributes {
        if !ATTRIBUTES.is_valid(attributes) {
            errors.general.push(ValidationErrorKind::InvalidAttributes);
            errors.details = attribute_details(attributes);
        }
    }

    ValidationResult {
        is_valid: errors.general.is_empty(),
        errors,
    }
}

/// Validate every object independently and cross-check the declared
/// attribute headers against each object's attribute trait types.
pub fn validate_many(
    objects: &[MetadataObject],
    declared_attributes: &[String],
) -> BatchValidationReport {
    let mut report = BatchValidationReport::default();

    for (index, object) in objects.iter().enumerate() {
        let result = validate(object);
        if !result.is_valid {
            report
                .metadata_objects_validation_errors
                .push(ObjectValidationError {
                    index,
                    errors: result.errors,
                });
        }

        let present = object.trait_types();
        for declared in declared_attributes {
            if !present.contains(&declared.as_str()) {
                report.missing_attributes_errors.push(MissingAttributeError {
                    index,
                    trait_type: declared.clone(),
                    cause: MissingCause::EmptyValue,
                });
            }
        }
    }

    report
}

/// A present, non-blank JSON string. Numbers and `null` do not count.
fn is_text(value: &Option<Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

fn is_valid_type(mime_type: Option<&str>, image: Option<&str>) -> bool {
    let Some(mime_type) = mime_type else {
        return false;
    };
    if !MIME_TYPE.is_valid(&Value::String(mime_type.to_string())) {
        return false;
    }

    let declared = mime_type.split('/').next().unwrap_or_default();
    match image.and_then(extension_category) {
        Some(expected) => expected == declared,
        None => true,
    }
}

/// Media category implied by the file extension of a URI, if recognized.
fn extension_category(uri: &str) -> Option<&'static str> {
    let extension = FILE_EXTENSION.captures(uri)?.get(1)?.as_str();

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" | "avif" => Some("image"),
        "mp4" | "webm" | "mov" => Some("video"),
        "mp3" | "wav" | "ogg" | "flac" => Some("audio"),
        "glb" | "gltf" => Some("model"),
        "pdf" => Some("application"),
        _ => None,
    }
}

fn attribute_details(attributes: &Value) -> Vec<String> {
    let Some(entries) = attributes.as_array() else {
        return vec![format!("attributes: expected an array, found {}", json_kind(attributes))];
    };

    entries
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| {
            ATTRIBUTE
                .iter_errors(entry)
                .map(move |e| format!("attributes[{}]: {}", i, e))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
