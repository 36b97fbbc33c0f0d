//! Mutating handler variants.
//!
//! Mutation applies the same logic to every operation, so there is no
//! per-operation branching here. A mutating response may carry a JSON Patch.

use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use tokio_util::sync::CancellationToken;

use super::{AdmissionFn, Handler, InjectClient, InjectDecoder, WebhookClients};
use crate::webhooks::decoder::Decoder;
use crate::webhooks::types::{AdmissionRequest, AdmissionResponse};

/// A single function invoked for every operation.
pub struct MutateFunc<K> {
    pub func: AdmissionFn<K>,
}

impl<K> MutateFunc<K> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&CancellationToken, &AdmissionRequest<K>) -> AdmissionResponse + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl<K> Handler<K> for MutateFunc<K>
where
    K: Send + Sync + 'static,
{
    async fn handle(
        &self,
        ctx: &CancellationToken,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        (self.func)(ctx, request)
    }
}

/// Business logic for a [`MutatingWebhook`]
#[async_trait]
pub trait Mutator<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn mutate(
        &self,
        ctx: &CancellationToken,
        clients: &WebhookClients,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse;
}

/// A mutating handler that accepts a decoder and a cluster client and lends
/// them to its [`Mutator`].
pub struct MutatingWebhook<M> {
    clients: WebhookClients,
    mutator: M,
}

impl<M> MutatingWebhook<M> {
    /// Wrap a mutator; collaborators arrive later through injection
    pub fn new(mutator: M) -> Self {
        Self {
            clients: WebhookClients::default(),
            mutator,
        }
    }

    /// The injected decoder, if any
    pub fn decoder(&self) -> Option<&Arc<Decoder>> {
        self.clients.decoder()
    }

    /// The injected cluster client, if any
    pub fn client(&self) -> Option<&Client> {
        self.clients.client()
    }

    /// The wrapped mutator
    pub fn mutator(&self) -> &M {
        &self.mutator
    }
}

impl<M: Default> Default for MutatingWebhook<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

#[async_trait]
impl<K, M> Handler<K> for MutatingWebhook<M>
where
    K: Send + Sync + 'static,
    M: Mutator<K>,
{
    async fn handle(
        &self,
        ctx: &CancellationToken,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        self.mutator.mutate(ctx, &self.clients, request).await
    }

    fn decoder_injector(&mut self) -> Option<&mut dyn InjectDecoder> {
        Some(&mut self.clients)
    }

    fn client_injector(&mut self) -> Option<&mut dyn InjectClient> {
        Some(&mut self.clients)
    }
}
