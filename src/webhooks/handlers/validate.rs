//! Validating handler variants.
//!
//! Validation is decided per operation. An operation without a rule is
//! denied: the absence of a rule is never permission.

use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AdmissionFn, Handler, InjectClient, InjectDecoder, WebhookClients};
use crate::webhooks::decoder::Decoder;
use crate::webhooks::types::{AdmissionRequest, AdmissionResponse, Operation};

/// Denial for an operation nobody registered a rule for
fn no_rule(operation: Operation) -> AdmissionResponse {
    debug!(operation = %operation, "No validation rule for operation");
    AdmissionResponse::denied(format!("operation {} is not permitted", operation))
}

/// One optional validation function per operation.
pub struct ValidateFuncs<K> {
    pub create: Option<AdmissionFn<K>>,
    pub update: Option<AdmissionFn<K>>,
    pub delete: Option<AdmissionFn<K>>,
}

impl<K> Default for ValidateFuncs<K> {
    fn default() -> Self {
        Self {
            create: None,
            update: None,
            delete: None,
        }
    }
}

impl<K> ValidateFuncs<K> {
    /// Create an empty set that denies every operation
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the CREATE rule
    pub fn on_create<F>(mut self, func: F) -> Self
    where
        F: Fn(&CancellationToken, &AdmissionRequest<K>) -> AdmissionResponse + Send + Sync + 'static,
    {
        self.create = Some(Box::new(func));
        self
    }

    /// Register the UPDATE rule
    pub fn on_update<F>(mut self, func: F) -> Self
    where
        F: Fn(&CancellationToken, &AdmissionRequest<K>) -> AdmissionResponse + Send + Sync + 'static,
    {
        self.update = Some(Box::new(func));
        self
    }

    /// Register the DELETE rule
    pub fn on_delete<F>(mut self, func: F) -> Self
    where
        F: Fn(&CancellationToken, &AdmissionRequest<K>) -> AdmissionResponse + Send + Sync + 'static,
    {
        self.delete = Some(Box::new(func));
        self
    }

    fn rule_for(&self, operation: Operation) -> Option<&AdmissionFn<K>> {
        match operation {
            Operation::Create => self.create.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Delete => self.delete.as_ref(),
            Operation::Connect | Operation::Unknown => None,
        }
    }
}

#[async_trait]
impl<K> Handler<K> for ValidateFuncs<K>
where
    K: Send + Sync + 'static,
{
    async fn handle(
        &self,
        ctx: &CancellationToken,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        match self.rule_for(request.operation) {
            Some(rule) => rule(ctx, request),
            None => no_rule(request.operation),
        }
    }
}

/// Business logic for a [`ValidatingWebhook`].
///
/// Every method denies unless overridden.
#[async_trait]
pub trait Validator<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn validate_create(
        &self,
        _ctx: &CancellationToken,
        _clients: &WebhookClients,
        _request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        no_rule(Operation::Create)
    }

    async fn validate_update(
        &self,
        _ctx: &CancellationToken,
        _clients: &WebhookClients,
        _request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        no_rule(Operation::Update)
    }

    async fn validate_delete(
        &self,
        _ctx: &CancellationToken,
        _clients: &WebhookClients,
        _request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        no_rule(Operation::Delete)
    }
}

/// A validating handler that accepts a decoder and a cluster client and
/// lends them to its [`Validator`].
pub struct ValidatingWebhook<V> {
    clients: WebhookClients,
    validator: V,
}

impl<V> ValidatingWebhook<V> {
    /// Wrap a validator; collaborators arrive later through injection
    pub fn new(validator: V) -> Self {
        Self {
            clients: WebhookClients::default(),
            validator,
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

    /// The wrapped validator
    pub fn validator(&self) -> &V {
        &self.validator
    }
}

impl<V: Default> Default for ValidatingWebhook<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

#[async_trait]
impl<K, V> Handler<K> for ValidatingWebhook<V>
where
    K: Send + Sync + 'static,
    V: Validator<K>,
{
    async fn handle(
        &self,
        ctx: &CancellationToken,
        request: &AdmissionRequest<K>,
    ) -> AdmissionResponse {
        let clients = &self.clients;
        match request.operation {
            Operation::Create => self.validator.validate_create(ctx, clients, request).await,
            Operation::Update => self.validator.validate_update(ctx, clients, request).await,
            Operation::Delete => self.validator.validate_delete(ctx, clients, request).await,
            Operation::Connect | Operation::Unknown => no_rule(request.operation),
        }
    }

    fn decoder_injector(&mut self) -> Option<&mut dyn InjectDecoder> {
        Some(&mut self.clients)
    }

    fn client_injector(&mut self) -> Option<&mut dyn InjectClient> {
        Some(&mut self.clients)
    }
}
