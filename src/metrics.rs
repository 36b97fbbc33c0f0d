//! Prometheus metrics for admission decisions.
//!
//! The surrounding server owns the HTTP endpoint; this module only keeps the
//! registry and renders it in the text exposition format.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

use crate::webhooks::Operation;

/// Labels for admission decision metrics (operation + outcome)
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AdmissionLabels {
    pub operation: Operation,
    pub allowed: bool,
}

impl EncodeLabelSet for AdmissionLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("operation", self.operation.as_str()).encode(encoder.encode_label())?;
        let allowed = if self.allowed { "true" } else { "false" };
        ("allowed", allowed).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for decode failures (which payload failed)
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DecodeLabels {
    pub field: &'static str,
}

impl EncodeLabelSet for DecodeLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("field", self.field).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared admission metrics
pub struct AdmissionMetrics {
    /// Admission decisions by operation and outcome
    pub requests_total: Family<AdmissionLabels, Counter>,
    /// Payloads that failed to decode
    pub decode_errors_total: Family<DecodeLabels, Counter>,
    /// Time spent producing a response
    pub handle_duration_seconds: Histogram,
    registry: Registry,
}

impl Default for AdmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionMetrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<AdmissionLabels, Counter>::default();
        registry.register(
            "admission_requests",
            "Total number of admission decisions",
            requests_total.clone(),
        );

        let decode_errors_total = Family::<DecodeLabels, Counter>::default();
        registry.register(
            "admission_decode_errors",
            "Total number of admission payloads that failed to decode",
            decode_errors_total.clone(),
        );

        let handle_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 15));
        registry.register(
            "admission_handle_duration_seconds",
            "Duration of admission handling in seconds",
            handle_duration_seconds.clone(),
        );

        Self {
            requests_total,
            decode_errors_total,
            handle_duration_seconds,
            registry,
        }
    }

    /// Record an admission decision
    pub fn record_decision(&self, operation: Operation, allowed: bool, duration_secs: f64) {
        self.requests_total
            .get_or_create(&AdmissionLabels { operation, allowed })
            .inc();
        self.handle_duration_seconds.observe(duration_secs);
    }

    /// Record a payload that failed to decode
    pub fn record_decode_error(&self, field: &'static str) {
        self.decode_errors_total
            .get_or_create(&DecodeLabels { field })
            .inc();
    }

    /// Number of decisions recorded for an operation and outcome
    pub fn decisions(&self, operation: Operation, allowed: bool) -> u64 {
        self.requests_total
            .get_or_create(&AdmissionLabels { operation, allowed })
            .get()
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}
