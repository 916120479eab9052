use std::fmt::Display;

use log::*;
use marketplace_engine::{
    events::EventProducers,
    traits::{CatalogManagement, MarketplaceDatabase},
    CatalogApi,
    OrderSyncApi,
};

use crate::{
    envelope::{EventEnvelope, WebhookTopic},
    errors::{HandlerError, HandlerOutcome},
    handlers,
    handlers::HandlerContext,
    remote::RemoteCommerce,
    retry::RetryConfig,
};

/// Dispatches delivered webhook envelopes to their topic handlers.
pub struct WebhookProcessor<B, R> {
    ctx: HandlerContext<B, R>,
}

impl<B, R> WebhookProcessor<B, R>
where
    B: MarketplaceDatabase + CatalogManagement,
    R: RemoteCommerce,
{
    pub fn new(db: B, producers: EventProducers, remote: R, retry: RetryConfig) -> Self {
        let ctx = HandlerContext {
            orders: OrderSyncApi::new(db.clone(), producers),
            catalog: CatalogApi::new(db),
            remote,
            retry,
        };
        Self { ctx }
    }

    /// Handles one envelope. Unsubscribed topics are skipped (the webhook subscription set can outpace a deployed
    /// processor); everything else either processes or fails with a classified error.
    pub async fn process(&self, envelope: &EventEnvelope) -> Result<HandlerOutcome, HandlerError> {
        let topic = envelope
            .topic()
            .ok_or_else(|| HandlerError::MalformedPayload("envelope metadata carries no topic".to_string()))?;
        let topic = match topic.parse::<WebhookTopic>() {
            Ok(topic) => topic,
            Err(e) => {
                warn!("📨️ {e}");
                return Ok(HandlerOutcome::Skipped(e.to_string()));
            },
        };
        let shop_domain = envelope
            .shop_domain()
            .ok_or_else(|| HandlerError::MalformedPayload("envelope metadata carries no shop domain".to_string()))?;
        debug!("📨️ {topic} event from {shop_domain}");
        match topic {
            WebhookTopic::OrdersCreate => {
                handlers::order_created(&self.ctx, shop_domain, envelope.parse_payload()?).await
            },
            WebhookTopic::OrdersPaid => handlers::order_paid(&self.ctx, shop_domain, envelope.parse_payload()?).await,
            WebhookTopic::OrdersCancelled => {
                handlers::order_cancelled(&self.ctx, shop_domain, envelope.parse_payload()?).await
            },
            WebhookTopic::OrdersFulfilled => {
                handlers::order_fulfilled(&self.ctx, shop_domain, envelope.parse_payload()?).await
            },
            WebhookTopic::ProductsCreate => {
                handlers::product_created(&self.ctx, shop_domain, envelope.parse_payload()?).await
            },
            WebhookTopic::ProductsUpdate => {
                handlers::product_updated(&self.ctx, shop_domain, envelope.parse_payload()?).await
            },
            // The uninstall payload names the store itself; the domain header is redundant here.
            WebhookTopic::AppUninstalled => handlers::app_uninstalled(&self.ctx, envelope.parse_payload()?).await,
        }
    }

    /// Handles a batch of envelopes in delivery order. A failing envelope is reported and does not stop the batch.
    pub async fn process_batch(&self, envelopes: &[EventEnvelope]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for envelope in envelopes {
            let result = self.process(envelope).await;
            summary.record(envelope, &result);
        }
        summary
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub already_processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, envelope: &EventEnvelope, result: &Result<HandlerOutcome, HandlerError>) {
        let reference = envelope.order_ref().or_else(|| envelope.topic()).unwrap_or("<unknown>");
        match result {
            Ok(HandlerOutcome::Processed) => self.processed += 1,
            Ok(HandlerOutcome::AlreadyProcessed) => self.already_processed += 1,
            Ok(HandlerOutcome::Skipped(reason)) => {
                info!("📨️ Skipped {reference}: {reason}");
                self.skipped += 1;
            },
            Err(e) => {
                error!("📨️ Handling {reference} failed: {e}");
                self.failed += 1;
            },
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.already_processed + self.skipped + self.failed
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} envelope(s): {} processed, {} already processed, {} skipped, {} failed",
            self.total(),
            self.processed,
            self.already_processed,
            self.skipped,
            self.failed
        )
    }
}
