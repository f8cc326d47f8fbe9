use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::{
    error::Result,
    models::{InboxMessage, InboxOrder},
    services::{process_bridge::ProcessBridge, swap_executor::SwapExecutor},
};

/// Number of inbox entries already handed to the poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboxCursor {
    pub last_seen: usize,
}

impl InboxCursor {
    /// Returns the entries appended since the last call and advances the cursor.
    ///
    /// The inbox is assumed append-only; a list that did not grow yields nothing
    /// and leaves the cursor untouched.
    pub fn take_new<'a>(&mut self, messages: &'a [InboxMessage]) -> &'a [InboxMessage] {
        if messages.len() <= self.last_seen {
            return &[];
        }
        let fresh = &messages[self.last_seen..];
        self.last_seen = messages.len();
        fresh
    }
}

/// Turns inbox orders into swaps executed through the ordering account.
pub struct InboxPoller {
    bridge: Arc<ProcessBridge>,
    executor: Arc<SwapExecutor>,
    base_token: String,
}

impl InboxPoller {
    pub fn new(bridge: Arc<ProcessBridge>, executor: Arc<SwapExecutor>, base_token: &str) -> Self {
        Self {
            bridge,
            executor,
            base_token: base_token.to_string(),
        }
    }

    /// Start inbox polling loop
    pub async fn start(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cursor = InboxCursor::default();

            loop {
                ticker.tick().await;

                if let Err(e) = self.process_once(&mut cursor).await {
                    tracing::error!("Inbox poller error: {}", e);
                }
            }
        });
    }

    /// One tick: reads the inbox and executes entries appended since `cursor`.
    /// Returns how many entries were handled (successfully or not).
    pub async fn process_once(&self, cursor: &mut InboxCursor) -> Result<usize> {
        let messages = self.bridge.read_inbox().await?;
        let fresh = cursor.take_new(&messages);
        if fresh.is_empty() {
            return Ok(0);
        }
        tracing::info!("{} new inbox message(s)", fresh.len());

        for message in fresh {
            match self.handle_message(message).await {
                Ok(tx_hash) => {
                    tracing::info!("Inbox message {} executed in {}", message.id, tx_hash)
                }
                Err(e) => tracing::error!(
                    "Inbox message {} from {} ({}) failed: {}",
                    message.id,
                    message.from,
                    message.readable_time,
                    e
                ),
            }
        }
        Ok(fresh.len())
    }

    async fn handle_message(&self, message: &InboxMessage) -> Result<String> {
        let order = InboxOrder::parse(&message.data)?;
        let (token_in, token_out) = order.token_pair(&self.base_token);
        let amount = order.amount_in()?.to_string();
        tracing::debug!(
            "Order {}: {} {} -> {} for {}",
            message.id,
            amount,
            token_in,
            token_out,
            order.account
        );

        let instruction = self.executor.instruction(
            &order.account,
            Some(&token_in),
            Some(&token_out),
            Some(&amount),
        )?;
        let outcome = self.executor.execute_single(&instruction).await?;

        let payload = order.executed_payload(message, &outcome.tx_hash);
        self.bridge.mark_executed(&payload).await?;
        Ok(outcome.tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::integrations::ao::action;
    use crate::mocks::{test_registry, MockBus, MockChain, MockDex};
    use serde_json::{json, Value};

    const ACCOUNT: &str = "0xabababababababababababababababababababab";

    fn inbox_json(count: usize) -> String {
        let entries: Vec<Value> = (1..=count)
            .map(|i| {
                let order = json!({
                    "account": ACCOUNT,
                    "operation": "sell",
                    "symbol": "WETH",
                    "amount": "0.5",
                });
                json!({
                    "id": format!("msg-{}", i),
                    "timestamp": 1_700_000_000_000i64 + i as i64,
                    "data": order.to_string(),
                    "from": "user",
                })
            })
            .collect();
        Value::Array(entries).to_string()
    }

    fn poller(bus: Arc<MockBus>, chain: Arc<MockChain>) -> InboxPoller {
        let config = Config::for_tests();
        let bridge = Arc::new(ProcessBridge::new(bus, &config));
        let executor = Arc::new(SwapExecutor::new(
            chain,
            Arc::new(MockDex::default()),
            Arc::new(test_registry()),
        ));
        InboxPoller::new(bridge, executor, "USDT")
    }

    fn executed_ids(bus: &MockBus) -> Vec<String> {
        bus.messages()
            .iter()
            .filter(|m| m.tags == action("Executed"))
            .map(|m| {
                let payload: Value = serde_json::from_str(&m.data).expect("payload");
                payload["id"].as_str().expect("id").to_string()
            })
            .collect()
    }

    #[test]
    fn cursor_yields_only_appended_suffix() {
        let messages: Vec<InboxMessage> = (0..4)
            .map(|i| InboxMessage {
                id: i.to_string(),
                timestamp: 0,
                data: String::new(),
                from: "x".to_string(),
                readable_time: String::new(),
            })
            .collect();
        let mut cursor = InboxCursor { last_seen: 2 };

        let fresh: Vec<_> = cursor.take_new(&messages).iter().map(|m| m.id.clone()).collect();
        assert_eq!(fresh, vec!["2", "3"]);
        assert_eq!(cursor.last_seen, 4);
        assert!(cursor.take_new(&messages).is_empty());
        assert!(cursor.take_new(&messages[..1]).is_empty());
        assert_eq!(cursor.last_seen, 4);
    }

    #[tokio::test]
    async fn grown_inbox_processes_each_new_message_once() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default().with_output(&config.ao_inbox_process, &inbox_json(5)));
        let chain = Arc::new(MockChain::default());
        let poller = poller(bus.clone(), chain.clone());
        let mut cursor = InboxCursor { last_seen: 5 };

        assert_eq!(poller.process_once(&mut cursor).await.expect("tick"), 0);

        bus.set_output(&config.ao_inbox_process, &inbox_json(8));
        assert_eq!(poller.process_once(&mut cursor).await.expect("tick"), 3);
        assert_eq!(poller.process_once(&mut cursor).await.expect("tick"), 0);

        assert_eq!(executed_ids(&bus), vec!["msg-6", "msg-7", "msg-8"]);
        // approval + swap per message
        assert_eq!(chain.executed_calls().len(), 6);
        assert_eq!(cursor.last_seen, 8);
    }

    #[tokio::test]
    async fn failed_message_still_advances_cursor() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default().with_output(&config.ao_inbox_process, &inbox_json(2)));
        let chain = Arc::new(MockChain::default().reverting("Swap transaction"));
        let poller = poller(bus.clone(), chain);
        let mut cursor = InboxCursor::default();

        assert_eq!(poller.process_once(&mut cursor).await.expect("tick"), 2);
        assert_eq!(cursor.last_seen, 2);
        assert!(executed_ids(&bus).is_empty());
    }

    #[tokio::test]
    async fn executed_payload_carries_tx_hash() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default().with_output(&config.ao_inbox_process, &inbox_json(1)));
        let poller = poller(bus.clone(), Arc::new(MockChain::default()));

        poller
            .process_once(&mut InboxCursor::default())
            .await
            .expect("tick");

        let sent = bus.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].process_id, config.ao_inbox_process);
        let payload: Value = serde_json::from_str(&sent[0].data).expect("payload");
        assert_eq!(payload["operation"], "sell");
        assert!(payload["txHash"].as_str().expect("hash").starts_with("0x"));
        assert_eq!(payload["timestamp"], 1_700_000_000_001i64);
    }
}
