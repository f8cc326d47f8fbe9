use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::{
    config::Config,
    constants::{PRICE_QUOTE_AMOUNT, PRICE_RESULT_DELAY_MS},
    error::Result,
    integrations::ao::{action, ProcessBus},
    models::PriceEntry,
    services::swap_executor::SwapExecutor,
};

/// Relays token prices (quoted against the base token) to an AO process.
pub struct PricePoller {
    executor: Arc<SwapExecutor>,
    bus: Arc<dyn ProcessBus>,
    price_process: String,
    tokens: Vec<String>,
    base_token: String,
    result_delay: Duration,
}

impl PricePoller {
    pub fn new(executor: Arc<SwapExecutor>, bus: Arc<dyn ProcessBus>, config: &Config) -> Self {
        Self {
            executor,
            bus,
            price_process: config.ao_price_process.clone(),
            tokens: config.price_tokens.clone(),
            base_token: config.base_token_symbol.clone(),
            result_delay: Duration::from_millis(PRICE_RESULT_DELAY_MS),
        }
    }

    /// Start price relay loop
    pub async fn start(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if let Err(e) = self.tick().await {
                    tracing::error!("Price poller error: {}", e);
                }
            }
        });
    }

    /// Quotes every configured token concurrently. A failed quote becomes an
    /// error entry instead of failing the batch.
    pub async fn collect_prices(&self) -> Vec<PriceEntry> {
        let quotes = self.tokens.iter().map(|symbol| async move {
            match self
                .executor
                .price(symbol, &self.base_token, PRICE_QUOTE_AMOUNT)
                .await
            {
                Ok(value) => PriceEntry::priced(symbol, value),
                Err(e) => {
                    tracing::warn!("Price for {} unavailable: {}", symbol, e);
                    PriceEntry::failed(symbol)
                }
            }
        });
        join_all(quotes).await
    }

    pub async fn tick(&self) -> Result<String> {
        let prices = self.collect_prices().await;
        let data = serde_json::to_string(&prices)?;
        let message_id = self
            .bus
            .message(&self.price_process, action("Price-Data"), data)
            .await?;
        tracing::info!("Sent {} prices as {}", prices.len(), message_id);

        sleep(self.result_delay).await;
        let result = self.bus.result(&self.price_process, &message_id).await?;
        tracing::debug!("Price-Data result: {}", result);
        Ok(message_id)
    }
}
