//! Admission request dispatcher.
//!
//! [`AdmissionHandler`] decodes the payloads of an incoming request, attaches
//! the typed objects to it and hands it to the configured [`Handler`]. It
//! fails closed: without a handler, or when any payload fails to decode, the
//! request is denied and business logic never runs.
//!
//! Collaborators are injected once at startup through
//! [`AdmissionHandler::inject_decoder`] and [`AdmissionHandler::inject_client`].
//! After that the dispatcher is shared read-only (typically behind an `Arc`)
//! and keeps no state between calls apart from optional metrics counters.

use std::sync::Arc;
use std::time::Instant;

use kube::core::DynamicObject;
use kube::core::admission::{
    AdmissionRequest as ReviewRequest, AdmissionResponse as ReviewResponse, AdmissionReview,
};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::metrics::AdmissionMetrics;
use crate::webhooks::decoder::Decoder;
use crate::webhooks::handlers::Handler;
use crate::webhooks::types::{AdmissionRequest, AdmissionResponse, RawExtension};

/// Metric label for the new-object payload
const FIELD_OBJECT: &str = "object";
/// Metric label for the old-object payload
const FIELD_OLD_OBJECT: &str = "oldObject";

/// Dispatches admission requests for objects of type `K` to a handler.
pub struct AdmissionHandler<K> {
    handler: Option<Box<dyn Handler<K>>>,
    decoder: Option<Arc<Decoder>>,
    metrics: Option<Arc<AdmissionMetrics>>,
}

impl<K> Default for AdmissionHandler<K> {
    fn default() -> Self {
        Self {
            handler: None,
            decoder: None,
            metrics: None,
        }
    }
}

impl<K> AdmissionHandler<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a dispatcher with no handler. It denies every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher delegating to `handler`
    pub fn with_handler(handler: impl Handler<K> + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::default()
        }
    }

    /// Record decisions in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<AdmissionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether a handler is configured
    pub fn is_configured(&self) -> bool {
        self.handler.is_some()
    }

    /// The configured handler, if any
    pub fn handler(&self) -> Option<&dyn Handler<K>> {
        self.handler.as_deref()
    }

    /// The decoder used for request payloads, if one was injected
    pub fn decoder(&self) -> Option<&Arc<Decoder>> {
        self.decoder.as_ref()
    }

    /// Supply the decoder used for payloads and forward it to the handler
    /// when the handler accepts one.
    ///
    /// Never fails; the `Result` keeps the call shape of other startup steps.
    pub fn inject_decoder(&mut self, decoder: Arc<Decoder>) -> Result<()> {
        match self.handler.as_mut().and_then(|h| h.decoder_injector()) {
            Some(injector) => {
                injector.inject_decoder(decoder.clone());
                debug!("Injected decoder into admission handler");
            }
            None => debug!("Admission handler does not accept a decoder"),
        }
        self.decoder = Some(decoder);
        Ok(())
    }

    /// Forward the cluster client to the handler when it accepts one.
    ///
    /// Never fails, even without a handler.
    pub fn inject_client(&mut self, client: Client) -> Result<()> {
        match self.handler.as_mut().and_then(|h| h.client_injector()) {
            Some(injector) => {
                injector.inject_client(client);
                debug!("Injected client into admission handler");
            }
            None => debug!("Admission handler does not accept a client"),
        }
        Ok(())
    }

    /// Decode the request payloads and delegate to the handler.
    ///
    /// Always produces a response. The handler's response is returned
    /// unchanged; every failure inside the dispatcher becomes a denial.
    pub async fn handle(
        &self,
        ctx: &CancellationToken,
        mut request: AdmissionRequest<K>,
    ) -> AdmissionResponse {
        let start = Instant::now();
        let uid = request.uid.clone();
        let operation = request.operation;
        debug!(
            uid = %uid,
            operation = %operation,
            namespace = ?request.namespace,
            name = ?request.name,
            "Processing admission request"
        );

        let response = match self.dispatch(ctx, &mut request).await {
            Ok(response) => response,
            Err(e) => {
                error!(uid = %uid, operation = %operation, error = %e, "Failed to prepare admission request");
                AdmissionResponse::denied(e.to_string())
            }
        };

        if response.allowed {
            info!(uid = %uid, operation = %operation, "Admission request allowed");
        } else {
            warn!(
                uid = %uid,
                operation = %operation,
                reason = response.reason.as_deref().unwrap_or_default(),
                "Admission request denied"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(operation, response.allowed, start.elapsed().as_secs_f64());
        }

        response
    }

    /// Answer a full `AdmissionReview`.
    ///
    /// The reply echoes the request uid. A review without a request is
    /// answered with kube's invalid response.
    pub async fn handle_review(
        &self,
        ctx: &CancellationToken,
        review: AdmissionReview<DynamicObject>,
    ) -> AdmissionReview<DynamicObject> {
        let request: ReviewRequest<DynamicObject> = match review.try_into() {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Failed to extract admission request");
                return ReviewResponse::invalid(Error::InvalidReview(e.to_string())).into_review();
            }
        };

        let response = match AdmissionRequest::<K>::from_review(&request) {
            Ok(core) => self.handle(ctx, core).await,
            Err(e) => {
                error!(uid = %request.uid, error = %e, "Failed to re-encode admission payload");
                AdmissionResponse::denied(e.to_string())
            }
        };
        response.into_review_response(&request).into_review()
    }

    /// Answer a JSON-encoded `AdmissionReview` body.
    ///
    /// Errors only when the body is not an `AdmissionReview` at all; the
    /// caller should answer those with a client error status.
    pub async fn handle_review_bytes(
        &self,
        ctx: &CancellationToken,
        body: &[u8],
    ) -> Result<Vec<u8>> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_slice(body)?;
        let answer = self.handle_review(ctx, review).await;
        Ok(serde_json::to_vec(&answer)?)
    }

    async fn dispatch(
        &self,
        ctx: &CancellationToken,
        request: &mut AdmissionRequest<K>,
    ) -> Result<AdmissionResponse> {
        let Some(handler) = self.handler.as_deref() else {
            debug!("No admission handler configured");
            return Ok(AdmissionResponse::denied(""));
        };

        self.decode_payload(&mut request.object, FIELD_OBJECT)?;
        self.decode_payload(&mut request.old_object, FIELD_OLD_OBJECT)?;

        Ok(handler.handle(ctx, request).await)
    }

    /// Decode a non-empty payload into a fresh object and attach it.
    fn decode_payload(&self, payload: &mut RawExtension<K>, field: &'static str) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }

        let decoder = self.decoder.as_ref().ok_or(Error::MissingDecoder)?;
        match decoder.decode::<K>(&payload.raw) {
            Ok(object) => {
                payload.object = Some(object);
                Ok(())
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_decode_error(field);
                }
                Err(e.into())
            }
        }
    }
}
