//! Object decoder for admission payloads.
//!
//! Admission payloads are the JSON documents the API server embeds in an
//! `AdmissionReview`. The decoder turns them into typed objects and, unless
//! built with [`Decoder::lenient`], rejects documents whose `apiVersion` or
//! `kind` does not belong to the target type.

use kube::Resource;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding an admission payload
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not valid JSON for the target type
    #[error("failed to decode object: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload declares a different resource type
    #[error("expected kind {expected}, found {found}")]
    KindMismatch { expected: String, found: String },
}

/// Decodes raw admission payloads into typed objects.
///
/// Decoders hold no per-request state and can be shared freely between
/// concurrent requests.
#[derive(Clone, Debug)]
pub struct Decoder {
    check_type: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder that verifies `apiVersion` and `kind` when present
    pub fn new() -> Self {
        Self { check_type: true }
    }

    /// Create a decoder that skips the type header check
    pub fn lenient() -> Self {
        Self { check_type: false }
    }

    /// Whether this decoder verifies the type header
    pub fn checks_type(&self) -> bool {
        self.check_type
    }

    /// Decode `raw` into a new instance of `K`.
    pub fn decode<K>(&self, raw: &[u8]) -> Result<K, DecodeError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        if !self.check_type {
            return serde_json::from_slice(raw).map_err(DecodeError::Malformed);
        }

        // Non-objects carry no header; the typed decode reports them
        let value: Value = serde_json::from_slice(raw).map_err(DecodeError::Malformed)?;
        if let Some(fields) = value.as_object() {
            let api_version = fields.get("apiVersion").and_then(Value::as_str);
            let kind = fields.get("kind").and_then(Value::as_str);
            check_type_header::<K>(api_version, kind)?;
        }
        serde_json::from_value(value).map_err(DecodeError::Malformed)
    }

    /// Decode `raw` into `target`, replacing its previous contents.
    ///
    /// `target` is left untouched when decoding fails.
    pub fn decode_into<K>(&self, raw: &[u8], target: &mut K) -> Result<(), DecodeError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        *target = self.decode(raw)?;
        Ok(())
    }
}

/// Reject a header naming another resource type. Missing fields are accepted.
fn check_type_header<K>(api_version: Option<&str>, kind: Option<&str>) -> Result<(), DecodeError>
where
    K: Resource<DynamicType = ()>,
{
    let expected_version = K::api_version(&());
    let expected_kind = K::kind(&());

    let version_matches = match api_version {
        None | Some("") => true,
        Some(v) => v == expected_version,
    };
    let kind_matches = match kind {
        None | Some("") => true,
        Some(k) => k == expected_kind,
    };

    if version_matches && kind_matches {
        return Ok(());
    }

    Err(DecodeError::KindMismatch {
        expected: format!("{}/{}", expected_version, expected_kind),
        found: format!(
            "{}/{}",
            api_version.unwrap_or_default(),
            kind.unwrap_or_default()
        ),
    })
}
