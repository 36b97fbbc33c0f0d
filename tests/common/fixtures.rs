//! Test fixtures and builder patterns for admission payloads.

use std::collections::BTreeMap;

use admission_dispatch::{AdmissionRequest, Operation};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Builder for creating Pod test fixtures.
///
/// # Example
/// ```
/// let pod = PodBuilder::new("foo")
///     .namespace("bar")
///     .node_name("jin")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct PodBuilder {
    name: String,
    namespace: Option<String>,
    node_name: Option<String>,
    labels: BTreeMap<String, String>,
}

impl PodBuilder {
    /// Create a new builder with the given pod name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            node_name: None,
            labels: BTreeMap::new(),
        }
    }

    /// Set the namespace for the pod.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the node the pod is scheduled on.
    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Add a label to the pod.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Build the Pod.
    pub fn build(self) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: self.namespace,
                labels: if self.labels.is_empty() {
                    None
                } else {
                    Some(self.labels)
                },
                ..Default::default()
            },
            spec: self.node_name.map(|node_name| PodSpec {
                node_name: Some(node_name),
                ..Default::default()
            }),
            status: None,
        }
    }
}

/// The pod used throughout the dispatch tests: `bar/foo` on node `jin`.
pub fn test_pod() -> Pod {
    PodBuilder::new("foo").namespace("bar").node_name("jin").build()
}

/// Serialize a pod the way the API server embeds it in a review.
#[allow(clippy::expect_used)]
pub fn raw_pod(pod: &Pod) -> Vec<u8> {
    serde_json::to_vec(pod).expect("pod serializes")
}

/// Bytes that are not JSON at all.
pub const MALFORMED: [u8; 5] = [1, 2, 3, 4, 5];

/// A request for `operation` carrying `raw` as the new object.
pub fn request_with_object(operation: Operation, raw: &[u8]) -> AdmissionRequest<Pod> {
    AdmissionRequest::new(operation).with_object(raw)
}

/// A request for `operation` carrying `raw` as the old object.
pub fn request_with_old_object(operation: Operation, raw: &[u8]) -> AdmissionRequest<Pod> {
    AdmissionRequest::new(operation).with_old_object(raw)
}

/// Build a cluster client that never connects, tagged with a default
/// namespace so tests can tell instances apart.
///
/// Must be called from within a Tokio runtime.
#[allow(clippy::expect_used)]
pub fn offline_client(default_namespace: &str) -> kube::Client {
    let mut config = kube::Config::new(
        "http://127.0.0.1:6443"
            .parse()
            .expect("static cluster url parses"),
    );
    config.default_namespace = default_namespace.to_string();
    kube::Client::try_from(config).expect("client builds without connecting")
}

