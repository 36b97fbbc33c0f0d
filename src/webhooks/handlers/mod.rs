//! Handler variants the dispatcher can delegate to.
//!
//! Every variant implements [`Handler`]. Variants that want the shared
//! [`Decoder`] or cluster [`Client`] say so by returning an injector from
//! [`Handler::decoder_injector`] / [`Handler::client_injector`]; the default
//! implementations return `None`, which makes injection a no-op.
//!
//! Provided variants:
//! - [`ValidateFuncs`]: one optional function per operation
//! - [`MutateFunc`]: one function for every operation
//! - [`ValidatingWebhook`] / [`MutatingWebhook`]: wrap a [`Validator`] or
//!   [`Mutator`] and hand it the injected collaborators

pub mod mutate;
pub mod validate;

use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::webhooks::decoder::Decoder;
use crate::webhooks::types::{AdmissionRequest, AdmissionResponse};

pub use mutate::{MutateFunc, MutatingWebhook, Mutator};
pub use validate::{ValidateFuncs, ValidatingWebhook, Validator};

/// A plain admission function: `(context, request) -> response`
pub type AdmissionFn<K> =
    Box<dyn Fn(&CancellationToken, &AdmissionRequest<K>) -> AdmissionResponse + Send + Sync>;

/// Produces an admission response for a decoded request.
///
/// Handlers are built once, receive their collaborators through injection
/// before serving, and are then shared read-only across concurrent requests.
#[async_trait]
pub trait Handler<K>: Send + Sync {
    /// Decide on a request whose payloads have already been decoded
    async fn handle(
        &self,
        ctx: &CancellationToken,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse;

    /// Access to the decoder setter, for handlers that accept one
    fn decoder_injector(&mut self) -> Option<&mut dyn InjectDecoder> {
        None
    }

    /// Access to the client setter, for handlers that accept one
    fn client_injector(&mut self) -> Option<&mut dyn InjectClient> {
        None
    }
}

/// Accepts a shared decoder
pub trait InjectDecoder {
    fn inject_decoder(&mut self, decoder: Arc<Decoder>);
}

/// Accepts a cluster client
pub trait InjectClient {
    fn inject_client(&mut self, client: Client);
}

/// Collaborators injected into a webhook and lent to its business logic.
#[derive(Clone, Default)]
pub struct WebhookClients {
    decoder: Option<Arc<Decoder>>,
    client: Option<Client>,
}

impl WebhookClients {
    /// The injected decoder, if any
    pub fn decoder(&self) -> Option<&Arc<Decoder>> {
        self.decoder.as_ref()
    }

    /// The injected cluster client, if any
    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }
}

impl InjectDecoder for WebhookClients {
    fn inject_decoder(&mut self, decoder: Arc<Decoder>) {
        self.decoder = Some(decoder);
    }
}

impl InjectClient for WebhookClients {
    fn inject_client(&mut self, client: Client) {
        self.client = Some(client);
    }
}
