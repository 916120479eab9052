//! The processor shell: open the database, wire the event hooks, and drain an NDJSON stream of envelopes from
//! stdin. The queue transport that produces this stream (and its acknowledgement semantics) lives outside this
//! crate; a failed envelope is reported in the summary and does not stop the stream.
use log::*;
use marketplace_engine::SqliteDatabase;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::ProcessorConfig,
    dispatcher::{BatchSummary, WebhookProcessor},
    envelope::EventEnvelope,
    errors::ProcessorError,
    integrations::create_notification_handlers,
    remote::ShopifyRemote,
};

pub async fn run_processor(config: ProcessorConfig) -> Result<BatchSummary, ProcessorError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 5)
        .await
        .map_err(|e| ProcessorError::InitializeError(format!("Could not open the database. {e}")))?;
    db.run_migrations().await.map_err(|e| ProcessorError::InitializeError(format!("Migrations failed. {e}")))?;

    let handlers = create_notification_handlers(db.clone(), config.event_buffer_size);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let remote = ShopifyRemote::new(&config.shopify_api_version);
    let processor = WebhookProcessor::new(db, producers, remote, config.retry.clone());

    let mut summary = BatchSummary::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let envelope: EventEnvelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("📨️ Envelope on line {line_no} is not valid JSON: {e}");
                summary.failed += 1;
                continue;
            },
        };
        let result = processor.process(&envelope).await;
        summary.record(&envelope, &result);
    }
    info!("📨️ Stream finished. {summary}");
    Ok(summary)
}
