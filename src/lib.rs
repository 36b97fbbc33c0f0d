//! admission-dispatch library crate
//!
//! Dispatches Kubernetes admission requests to validating or mutating
//! handlers. The dispatcher decodes object payloads, attaches the typed
//! objects to the request and fails closed: a request is denied when no
//! handler is configured or when a payload does not decode.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use admission_dispatch::{AdmissionHandler, AdmissionResponse, Decoder, ValidateFuncs};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! let funcs = ValidateFuncs::<Pod>::new()
//!     .on_create(|_, _| AdmissionResponse::allowed(""))
//!     .on_update(|_, _| AdmissionResponse::denied("pods are immutable"));
//!
//! let mut dispatcher = AdmissionHandler::with_handler(funcs);
//! dispatcher.inject_decoder(Arc::new(Decoder::new())).ok();
//! ```

pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod webhooks;

pub use error::{Error, Result};
pub use metrics::AdmissionMetrics;
pub use webhooks::{
    AdmissionHandler, AdmissionRequest, AdmissionResponse, AdmissionReview, DecodeError, Decoder,
    Handler, InjectClient, InjectDecoder, MutateFunc, MutatingWebhook, Mutator, Operation,
    ValidateFuncs, ValidatingWebhook, Validator, WebhookClients,
};
