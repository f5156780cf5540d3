use chatease::{api::start_server, config::ChatbotConfig, conversational::Chatbot};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ChatbotConfig::from_env()?;

    info!("ChatEase - API Server");
    info!("Port: {}", config.api_port);

    // Catalog and model load once; a failure here stops the process
    let chatbot = Arc::new(Chatbot::from_config(&config)?);

    info!("Chatbot initialized");

    start_server(chatbot, config.api_port).await?;

    Ok(())
}
