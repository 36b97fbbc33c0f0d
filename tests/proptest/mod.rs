// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for admission-dispatch.
//!
//! Uses proptest to generate random requests and verify the dispatcher's
//! fail-closed invariants.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use admission_dispatch::{
    AdmissionHandler, AdmissionRequest, AdmissionResponse, Decoder, MutateFunc, Operation,
    ValidateFuncs,
};
use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::Operation as ReviewOperation;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use common::fixtures::{PodBuilder, raw_pod};

/// Strategy for generating operations, including unrecognized ones.
fn any_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Create),
        Just(Operation::Update),
        Just(Operation::Delete),
        Just(Operation::Connect),
        Just(Operation::Unknown),
    ]
}

/// Strategy for generating optional raw payloads of arbitrary bytes.
fn any_payload() -> impl Strategy<Value = Option<Vec<u8>>> {
    proptest::option::of(proptest::collection::vec(any::<u8>(), 0..64))
}

/// Strategy for generating DNS-label-like names.
fn any_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}"
}

/// Strategy for generating bytes that can never be valid JSON.
fn malformed_payload() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..0x20, 1..32)
        .prop_filter("must not be whitespace only", |bytes| {
            bytes.iter().any(|b| !b" \t\r\n".contains(b))
        })
}

fn build_request(
    operation: Operation,
    object: Option<Vec<u8>>,
    old_object: Option<Vec<u8>>,
) -> AdmissionRequest<Pod> {
    let mut request = AdmissionRequest::new(operation);
    if let Some(raw) = object {
        request = request.with_object(raw);
    }
    if let Some(raw) = old_object {
        request = request.with_old_object(raw);
    }
    request
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn counting_dispatcher(calls: Arc<AtomicUsize>) -> AdmissionHandler<Pod> {
    let mut dispatcher = AdmissionHandler::with_handler(MutateFunc::<Pod>::new(move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        AdmissionResponse::allowed("")
    }));
    dispatcher.inject_decoder(Arc::new(Decoder::new())).unwrap();
    dispatcher
}

proptest! {
    /// Property: Without a handler every request is denied.
    #[test]
    fn test_unconfigured_always_denies(
        operation in any_operation(),
        object in any_payload(),
        old_object in any_payload(),
    ) {
        let mut dispatcher = AdmissionHandler::<Pod>::new();
        dispatcher.inject_decoder(Arc::new(Decoder::new())).unwrap();
        let request = build_request(operation, object, old_object);

        let response = block_on(dispatcher.handle(&CancellationToken::new(), request));
        prop_assert!(!response.allowed);
    }

    /// Property: A malformed payload in either position denies the request
    /// and never reaches the handler.
    #[test]
    fn test_malformed_payload_never_reaches_handler(
        operation in any_operation(),
        garbage in malformed_payload(),
        as_old_object in any::<bool>(),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting_dispatcher(calls.clone());
        let request = if as_old_object {
            build_request(operation, None, Some(garbage))
        } else {
            build_request(operation, Some(garbage), None)
        };

        let response = block_on(dispatcher.handle(&CancellationToken::new(), request));
        prop_assert!(!response.allowed);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Property: A decodable pod is attached to the request field for field.
    #[test]
    fn test_decoded_pod_matches_source(
        name in any_name(),
        namespace in any_name(),
        node in any_name(),
    ) {
        let pod = PodBuilder::new(name).namespace(namespace).node_name(node).build();
        let expected = pod.clone();
        let mut dispatcher = AdmissionHandler::with_handler(MutateFunc::new(
            move |_, request: &AdmissionRequest<Pod>| {
                if request.object.object.as_ref() == Some(&expected) {
                    AdmissionResponse::allowed("")
                } else {
                    AdmissionResponse::denied("decoded object differs")
                }
            },
        ));
        dispatcher.inject_decoder(Arc::new(Decoder::new())).unwrap();

        let request = build_request(Operation::Create, Some(raw_pod(&pod)), None);
        let response = block_on(dispatcher.handle(&CancellationToken::new(), request));
        prop_assert!(response.allowed, "reason: {:?}", response.reason);
    }

    /// Property: Only operations with a registered rule are allowed.
    #[test]
    fn test_only_registered_operations_allowed(operation in any_operation()) {
        let mut dispatcher = AdmissionHandler::with_handler(
            ValidateFuncs::<Pod>::new().on_create(|_, _| AdmissionResponse::allowed("")),
        );
        dispatcher.inject_decoder(Arc::new(Decoder::new())).unwrap();

        let request = build_request(operation, Some(raw_pod(&common::fixtures::test_pod())), None);
        let response = block_on(dispatcher.handle(&CancellationToken::new(), request));
        prop_assert_eq!(response.allowed, operation == Operation::Create);
    }

    /// Property: Every wire operation maps to the operation of the same name.
    #[test]
    fn test_review_operation_keeps_wire_name(operation in any_operation()) {
        prop_assume!(operation != Operation::Unknown);
        let wire: ReviewOperation =
            serde_json::from_str(&format!("\"{}\"", operation.as_str())).unwrap();
        prop_assert_eq!(Operation::from(&wire), operation);
    }

    /// Property: A review answer echoes the request uid and decodes its pod.
    #[test]
    fn test_review_echoes_uid(uid in "[a-f0-9]{8}-[a-f0-9]{4}", name in any_name()) {
        let pod = PodBuilder::new(name.clone()).build();
        let mut dispatcher = AdmissionHandler::with_handler(MutateFunc::new(
            |_, request: &AdmissionRequest<Pod>| {
                let name = request.object.object.as_ref().and_then(|p| p.metadata.name.clone());
                AdmissionResponse::allowed(name.unwrap_or_default())
            },
        ));
        dispatcher.inject_decoder(Arc::new(Decoder::new())).unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": uid,
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "operation": "CREATE",
                "userInfo": {},
                "object": pod,
            }
        }))
        .unwrap();
        let answer = block_on(dispatcher.handle_review_bytes(&CancellationToken::new(), &body));
        let answer: serde_json::Value = serde_json::from_slice(&answer.unwrap()).unwrap();
        prop_assert_eq!(&answer["response"]["uid"], &serde_json::Value::String(uid));
        prop_assert_eq!(&answer["response"]["status"]["message"], &serde_json::Value::String(name));
    }
}
