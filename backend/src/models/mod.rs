//! Domain models for the nftmint pipeline.
//!
//! - [`MetadataObject`] - HIP-412 metadata for one token
//! - [`Attribute`] - one `{trait_type, value}` entry
//! - [`MintItem`] - what is submitted per token (URI or metadata)
//! - [`MintOutcome`] - a minted item paired with its serial number
//! - [`TokenId`], [`SupplyKey`] - identifiers passed through to the ledger

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ConfigError;

/// Value written to `format` by the converter.
pub const HIP412_FORMAT: &str = "HIP412@2.0.0";

/// Ledger-assigned serial number of a minted token.
pub type SerialNumber = u64;

// =============================================================================
// Metadata Object
// =============================================================================

/// HIP-412 metadata for one token.
///
/// Fields hold raw JSON. A malformed value such as a numeric `type` or an
/// explicit `null` deserializes and is reported by validation for that
/// object alone. A key that is present, even as `null`, is `Some`; only a
/// missing key is `None`. Use the accessors for the string view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataObject {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub creator: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,

    /// URI of the token image.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,

    /// MIME type of `image`.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,

    /// Remaining HIP-412 fields (`checksum`, `files`, `localization`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Only called for keys that are present, so `null` becomes `Some(Null)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn as_text(field: &Option<Value>) -> Option<&str> {
    field.as_ref().and_then(Value::as_str)
}

impl MetadataObject {
    /// Create an object with the three required fields.
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(Value::String(name.into())),
            image: Some(Value::String(image.into())),
            mime_type: Some(Value::String(mime_type.into())),
            ..Self::default()
        }
    }

    /// `name`, if it is a string.
    pub fn name(&self) -> Option<&str> {
        as_text(&self.name)
    }

    pub fn creator(&self) -> Option<&str> {
        as_text(&self.creator)
    }

    pub fn description(&self) -> Option<&str> {
        as_text(&self.description)
    }

    /// `image`, if it is a string.
    pub fn image(&self) -> Option<&str> {
        as_text(&self.image)
    }

    /// `type`, if it is a string.
    pub fn mime_type(&self) -> Option<&str> {
        as_text(&self.mime_type)
    }

    pub fn format(&self) -> Option<&str> {
        as_text(&self.format)
    }

    /// Trait types of the well-formed entries in `attributes`.
    pub fn trait_types(&self) -> Vec<&str> {
        self.attributes
            .as_ref()
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("trait_type").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Attribute
// =============================================================================

/// Value of an attribute: string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(serde_json::Number),
}

/// One entry of the `attributes` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: AttributeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
}

impl Attribute {
    pub fn text(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: AttributeValue::Text(value.into()),
            display_type: None,
        }
    }
}

// =============================================================================
// Mint Items and Outcomes
// =============================================================================

/// Content submitted to the ledger for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MintItem {
    /// A metadata URI or any raw string content.
    Uri(String),
    /// A full metadata object, submitted as compact JSON.
    Metadata(MetadataObject),
}

impl MintItem {
    /// The string stored on the ledger for this item.
    pub fn content(&self) -> Result<String, serde_json::Error> {
        match self {
            MintItem::Uri(uri) => Ok(uri.clone()),
            MintItem::Metadata(object) => serde_json::to_string(object),
        }
    }
}

impl fmt::Display for MintItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintItem::Uri(uri) => f.write_str(uri),
            MintItem::Metadata(object) => {
                let json = serde_json::to_string(object).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<String> for MintItem {
    fn from(uri: String) -> Self {
        MintItem::Uri(uri)
    }
}

impl From<MetadataObject> for MintItem {
    fn from(object: MetadataObject) -> Self {
        MintItem::Metadata(object)
    }
}

/// A minted item and the serial number the ledger assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintOutcome {
    pub content: MintItem,
    pub serial_number: SerialNumber,
}

// =============================================================================
// Identifiers
// =============================================================================

/// Token (collection) identifier, e.g. `0.0.1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Reject blank identifiers; the format itself is checked by the ledger.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::MissingTokenId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signing credential authorizing minting. Never inspected, only passed on.
#[derive(Clone, PartialEq, Eq)]
pub struct SupplyKey(String);

impl SupplyKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::MissingSupplyKey);
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SupplyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SupplyKey(***)")
    }
}

// =============================================================================
// Tests
// =============================================================================
