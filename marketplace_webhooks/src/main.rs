use dotenvy::dotenv;
use log::info;
use marketplace_webhooks::{config::ProcessorConfig, runner::run_processor};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ProcessorConfig::from_env_or_default();

    info!("🚀️ Starting webhook processor against {}", config.database_url);
    match run_processor(config).await {
        Ok(summary) => println!("{summary}"),
        Err(e) => eprintln!("{e}"),
    }
}
