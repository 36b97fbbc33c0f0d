//! Admission request and response types.
//!
//! The `AdmissionReview` envelope itself is kube's
//! [`kube::core::admission`] model. The types here are what handlers see:
//! a request whose object payloads stay as raw JSON bytes until the
//! dispatcher decodes them into `K`, and a plain response that is turned
//! into kube's response at the review boundary.

use std::fmt;

use k8s_openapi::api::authentication::v1::UserInfo;
use kube::core::admission::{
    AdmissionRequest as ReviewRequest, AdmissionResponse as ReviewResponse,
    Operation as ReviewOperation,
};
use kube::core::{DynamicObject, GroupVersionKind, GroupVersionResource};
use tracing::warn;

use crate::error::Error;

/// The kind of change an admission request describes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
    /// Operation not set on a hand-built request
    #[default]
    Unknown,
}

impl Operation {
    /// Wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
            Operation::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ReviewOperation> for Operation {
    fn from(operation: &ReviewOperation) -> Self {
        match operation {
            ReviewOperation::Create => Operation::Create,
            ReviewOperation::Update => Operation::Update,
            ReviewOperation::Delete => Operation::Delete,
            ReviewOperation::Connect => Operation::Connect,
        }
    }
}

/// An object payload: the raw JSON sent by the API server plus, once the
/// dispatcher has decoded it, the typed object.
#[derive(Clone, Debug, PartialEq)]
pub struct RawExtension<K> {
    /// Raw JSON bytes; empty when the payload is absent
    pub raw: Vec<u8>,
    /// Decoded object, populated by the dispatcher
    pub object: Option<K>,
}

impl<K> Default for RawExtension<K> {
    fn default() -> Self {
        Self {
            raw: Vec::new(),
            object: None,
        }
    }
}

impl<K> RawExtension<K> {
    /// Create an undecoded payload from raw bytes
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: raw.into(),
            object: None,
        }
    }

    /// Whether the payload carries no bytes
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn from_review(object: Option<&DynamicObject>) -> serde_json::Result<Self> {
        match object {
            Some(object) => Ok(Self::new(serde_json::to_vec(object)?)),
            None => Ok(Self::default()),
        }
    }
}

/// An admission request for objects of type `K`.
///
/// Any field may be absent; in particular `object` is empty on DELETE and
/// `old_object` is empty on CREATE.
#[derive(Clone, Debug)]
pub struct AdmissionRequest<K> {
    pub uid: String,
    pub kind: Option<GroupVersionKind>,
    pub resource: Option<GroupVersionResource>,
    pub sub_resource: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub operation: Operation,
    pub user_info: UserInfo,
    pub object: RawExtension<K>,
    pub old_object: RawExtension<K>,
    pub dry_run: bool,
}

impl<K> Default for AdmissionRequest<K> {
    fn default() -> Self {
        Self {
            uid: String::new(),
            kind: None,
            resource: None,
            sub_resource: None,
            name: None,
            namespace: None,
            operation: Operation::Unknown,
            user_info: UserInfo::default(),
            object: RawExtension::default(),
            old_object: RawExtension::default(),
            dry_run: false,
        }
    }
}

impl<K> AdmissionRequest<K> {
    /// Create an empty request for the given operation
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            ..Default::default()
        }
    }

    /// Build a request from the one carried by a review, re-encoding its
    /// object payloads as raw JSON.
    pub fn from_review(request: &ReviewRequest<DynamicObject>) -> Result<Self, Error> {
        Ok(Self {
            uid: request.uid.clone(),
            kind: Some(request.kind.clone()),
            resource: Some(request.resource.clone()),
            sub_resource: request.sub_resource.clone(),
            name: non_empty(request.name.clone()),
            namespace: request.namespace.clone(),
            operation: Operation::from(&request.operation),
            user_info: request.user_info.clone(),
            object: RawExtension::from_review(request.object.as_ref())?,
            old_object: RawExtension::from_review(request.old_object.as_ref())?,
            dry_run: request.dry_run,
        })
    }

    /// Set the request uid
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Set the raw new-object payload
    pub fn with_object(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.object = RawExtension::new(raw);
        self
    }

    /// Set the raw old-object payload
    pub fn with_old_object(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.old_object = RawExtension::new(raw);
        self
    }
}

/// The outcome of an admission request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdmissionResponse {
    /// Whether the change is admitted
    pub allowed: bool,
    /// Human-readable reason, reported as `status.message`
    pub reason: Option<String>,
    /// JSON Patch document (mutating handlers only)
    pub patch: Option<Vec<u8>>,
    /// Warnings returned to the requesting client
    pub warnings: Vec<String>,
}

impl AdmissionResponse {
    /// Create an allowed response. An empty reason is treated as none.
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: non_empty(reason.into()),
            ..Default::default()
        }
    }

    /// Create a denied response. An empty reason is treated as none.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: non_empty(reason.into()),
            ..Default::default()
        }
    }

    /// Attach a JSON Patch document
    pub fn with_patch(mut self, patch: impl Into<Vec<u8>>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    /// Append a warning
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Answer `request` with this decision.
    ///
    /// The uid comes from the request. A patch that is not a JSON Patch
    /// document turns the answer into a denial.
    pub fn into_review_response(self, request: &ReviewRequest<DynamicObject>) -> ReviewResponse {
        let mut reply = ReviewResponse::from(request);
        if !self.allowed {
            reply = reply.deny(self.reason.unwrap_or_default());
        } else if let Some(reason) = self.reason {
            reply.result.message = reason;
        }
        if !self.warnings.is_empty() {
            reply.warnings = Some(self.warnings);
        }

        let Some(patch) = self.patch else {
            return reply;
        };
        let patched = serde_json::from_slice::<json_patch::Patch>(&patch)
            .map_err(|e| Error::InvalidPatch(e.to_string()))
            .and_then(|patch| {
                reply
                    .with_patch(patch)
                    .map_err(|e| Error::InvalidPatch(e.to_string()))
            });
        match patched {
            Ok(reply) => reply,
            Err(e) => {
                warn!(uid = %request.uid, error = %e, "Handler returned an unusable patch");
                ReviewResponse::from(request).deny(e.to_string())
            }
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
