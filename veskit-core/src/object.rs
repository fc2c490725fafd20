use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VesError;

/// Cross-vault reference carried by files and vault keys.
///
/// This is where an item's external `ves://domain/externalId` address comes
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    /// Vault domain the object belongs to.
    pub domain: String,
    /// Human-meaningful identifier within the domain.
    #[serde(rename = "externalId")]
    pub external_id: String,
}

/// A file entity wrapped by a vault item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VesFile {
    /// Server-assigned file id; 0 for a not-yet-created file.
    #[serde(default)]
    pub id: u64,
    /// Cross-vault reference, when the file is externally addressable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalRef>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Storage path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// MIME type of the content.
    #[serde(default, rename = "mime", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A recipient principal capable of holding a decryption grant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultKey {
    /// Server-assigned key id; 0 for a not-yet-created key.
    #[serde(default)]
    pub id: u64,
    /// Key kind, e.g. `current` or `temp`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Asymmetric algorithm identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    /// PEM-encoded public key.
    #[serde(default, rename = "publicKey", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Cross-vault reference, when the key is externally addressable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalRef>,
}

impl VesFile {
    /// Creates an id-only stub to be resolved on first access.
    #[must_use]
    pub fn stub(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// True when only the id is known and the detail has not been fetched.
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.external.is_none()
            && self.name.is_none()
            && self.path.is_none()
            && self.mime_type.is_none()
    }

    /// Serializes the file into its wire sub-record.
    #[must_use]
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decodes a file sub-record. A bare number yields a lazy stub.
    ///
    /// # Errors
    /// Returns [`VesError::Decode`] when the value is neither an object nor
    /// a numeric reference.
    pub fn from_record(record: &Value) -> Result<Self, VesError> {
        from_sub_record(record, "file", Self::stub)
    }
}

impl VaultKey {
    /// Creates an id-only stub to be resolved on first access.
    #[must_use]
    pub fn stub(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// True when only the id is known and the detail has not been fetched.
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.key_type.is_none() && self.public_key.is_none() && self.external.is_none()
    }

    /// Serializes the key into its wire sub-record.
    #[must_use]
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decodes a vault key sub-record. A bare number yields a lazy stub.
    ///
    /// # Errors
    /// Returns [`VesError::Decode`] when the value is neither an object nor
    /// a numeric reference.
    pub fn from_record(record: &Value) -> Result<Self, VesError> {
        from_sub_record(record, "vaultKey", Self::stub)
    }
}

fn from_sub_record<T: serde::de::DeserializeOwned>(
    record: &Value,
    field: &'static str,
    stub: impl FnOnce(u64) -> T,
) -> Result<T, VesError> {
    match record {
        Value::Number(n) => n
            .as_u64()
            .map(stub)
            .ok_or_else(|| VesError::decode(field, "reference id is not a u64")),
        Value::Object(_) => serde_json::from_value(record.clone())
            .map_err(|e| VesError::decode(field, e.to_string())),
        other => Err(VesError::decode(
            field,
            format!("expected object or id reference, got {other}"),
        )),
    }
}

/// The polymorphic object a vault item may wrap.
///
/// Exactly one variant is active at a time; the discriminator and payload
/// cannot disagree. Unrecognized wire discriminators decode to
/// [`LinkedObject::Generic`] instead of failing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LinkedObject {
    /// No embedded object.
    #[default]
    None,
    /// The item wraps a file entity.
    File(VesFile),
    /// The item wraps a vault key (e.g. a temporary recovery key).
    VaultKey(VaultKey),
    /// Opaque object of a kind this client does not model.
    Generic(Value),
}

impl LinkedObject {
    /// The embedded file, if that variant is active.
    #[must_use]
    pub fn as_file(&self) -> Option<&VesFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// The embedded vault key, if that variant is active.
    #[must_use]
    pub fn as_vault_key(&self) -> Option<&VaultKey> {
        match self {
            Self::VaultKey(key) => Some(key),
            _ => None,
        }
    }

    /// The wire discriminator field this object serializes under.
    #[must_use]
    pub fn discriminator(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::File(_) => Some("file"),
            Self::VaultKey(_) => Some("vaultKey"),
            Self::Generic(_) => Some("object"),
        }
    }
}
