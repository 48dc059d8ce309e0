use std::sync::Arc;

use chat_warden::enforcement::{EnforcementEngine, ModerationStore};
use chat_warden::vk::{LongPoller, VkClient};
use chat_warden::{BOT_NAME, Config, Error, logging};
use tracing::info;

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    // Load environment variables
    let config = Config::from_env()?;

    let store = ModerationStore::open(&config.database_path)?;
    let client = Arc::new(VkClient::new(config.token.clone())?);
    let engine = Arc::new(EnforcementEngine::new(
        store,
        client.clone(),
        config.owner_id,
    ));
    let poller = LongPoller::new(client, config.group_id);

    logging::log_console(format!("{BOT_NAME} starting"));
    tokio::select! {
        () = poller.run(engine) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping");
        }
    }

    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {err}");
    }
}
