use marketplace_engine::events::EventProducers;
use serde_json::json;

use crate::{
    dispatcher::WebhookProcessor,
    envelope::EventEnvelope,
    errors::{HandlerError, HandlerOutcome},
    handler_tests::mocks::{fast_retry, MockDb, MockRemote},
};

fn envelope(value: serde_json::Value) -> EventEnvelope {
    serde_json::from_value(value).expect("valid envelope")
}

fn processor() -> WebhookProcessor<MockDb, MockRemote> {
    let mut db = MockDb::new();
    db.expect_clone().returning(MockDb::new);
    WebhookProcessor::new(db, EventProducers::default(), MockRemote::new(), fast_retry())
}

#[tokio::test]
async fn unsubscribed_topics_are_skipped() {
    let processor = processor();
    let envelope = envelope(json!({
        "metadata": {
            "X-Shopify-Shop-Domain": "merchant.myshopify.com",
            "X-Shopify-Topic": "customers/create"
        },
        "payload": {}
    }));
    let outcome = processor.process(&envelope).await.unwrap();
    assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
}

#[tokio::test]
async fn an_envelope_without_a_topic_is_malformed() {
    let processor = processor();
    let envelope = envelope(json!({
        "metadata": { "X-Shopify-Shop-Domain": "merchant.myshopify.com" },
        "payload": {}
    }));
    let err = processor.process(&envelope).await.unwrap_err();
    assert!(matches!(err, HandlerError::MalformedPayload(_)));
}

#[tokio::test]
async fn an_envelope_without_a_shop_domain_is_malformed() {
    let processor = processor();
    let envelope = envelope(json!({
        "metadata": { "X-Shopify-Topic": "orders/create" },
        "payload": {}
    }));
    let err = processor.process(&envelope).await.unwrap_err();
    assert!(matches!(err, HandlerError::MalformedPayload(_)));
}

#[tokio::test]
async fn batches_keep_going_after_failures() {
    let processor = processor();
    let envelopes = vec![
        envelope(json!({
            "metadata": { "X-Shopify-Shop-Domain": "m.myshopify.com", "X-Shopify-Topic": "customers/create" },
            "payload": {}
        })),
        envelope(json!({
            "metadata": { "X-Shopify-Topic": "orders/create" },
            "payload": {}
        })),
    ];
    let summary = processor.process_batch(&envelopes).await;
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total(), 2);
}
