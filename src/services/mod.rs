// All service modules
pub mod account_service;
pub mod custody;
pub mod dex;
pub mod inbox_poller;
pub mod onchain;
pub mod price_poller;
pub mod process_bridge;
pub mod swap_executor;
pub mod token_registry;

// Re-export for convenience
pub use account_service::AccountService;
pub use custody::{CustodyGuard, CustodyOutcome};
pub use inbox_poller::InboxPoller;
pub use price_poller::PricePoller;
pub use process_bridge::ProcessBridge;
pub use swap_executor::SwapExecutor;
pub use token_registry::TokenRegistry;

use std::sync::Arc;
use tokio::time::Duration;

use crate::{config::Config, integrations::ao::ProcessBus};

/// Start the pollers enabled in config
pub async fn start_background_services(
    config: Arc<Config>,
    executor: Arc<SwapExecutor>,
    bridge: Arc<ProcessBridge>,
    bus: Arc<dyn ProcessBus>,
) {
    tracing::info!("Starting background services...");

    if config.enable_inbox_poller {
        let poller = Arc::new(InboxPoller::new(
            bridge,
            executor.clone(),
            &config.base_token_symbol,
        ));
        poller
            .start(Duration::from_secs(config.inbox_poll_secs))
            .await;
        tracing::info!(
            "Inbox poller watching {} every {}s",
            config.ao_inbox_process,
            config.inbox_poll_secs
        );
    } else {
        tracing::warn!("Inbox poller disabled via ENABLE_INBOX_POLLER");
    }

    if config.enable_price_poller {
        let poller = Arc::new(PricePoller::new(executor, bus, &config));
        poller
            .start(Duration::from_secs(config.price_poll_secs))
            .await;
        tracing::info!(
            "Price poller relaying {:?} every {}s",
            config.price_tokens,
            config.price_poll_secs
        );
    } else {
        tracing::warn!("Price poller disabled via ENABLE_PRICE_POLLER");
    }

    tracing::info!("All background services started successfully");
}
