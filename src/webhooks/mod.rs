//! Admission webhook dispatch.
//!
//! This module turns `admission.k8s.io/v1` requests into decisions:
//! - `types`: the request and response handlers see, plus their conversion
//!   to and from kube's `AdmissionReview` model
//! - `decoder`: typed decoding of object payloads
//! - `handlers`: validating and mutating handler variants
//! - `dispatcher`: decode-then-delegate with a fail-closed default

pub mod decoder;
pub mod dispatcher;
pub mod handlers;
pub mod types;

pub use decoder::{DecodeError, Decoder};
pub use dispatcher::AdmissionHandler;
pub use handlers::{
    AdmissionFn, Handler, InjectClient, InjectDecoder, MutateFunc, MutatingWebhook, Mutator,
    ValidateFuncs, ValidatingWebhook, Validator, WebhookClients,
};
pub use types::{AdmissionRequest, AdmissionResponse, Operation, RawExtension};

// Re-export the kube-rs review envelope accepted by `AdmissionHandler::handle_review`
pub use kube::core::admission::AdmissionReview;
