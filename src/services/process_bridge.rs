use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    config::Config,
    error::{AppError, Result},
    integrations::ao::{action, ProcessBus},
    models::{parse_inbox, InboxMessage, Tag},
};

const USER_PROCESSES_QUERY: &str = "require('json').encode(user_processes, { indent = true })";
const INBOX_QUERY: &str = "require('json').encode(Inbox_data, { indent = true })";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProcess {
    pub process_id: String,
    pub name: String,
}

/// Process lifecycle and messaging on top of a [`ProcessBus`].
pub struct ProcessBridge {
    bus: Arc<dyn ProcessBus>,
    registry_process: String,
    inbox_process: String,
    chat_process: Option<String>,
}

impl ProcessBridge {
    pub fn new(bus: Arc<dyn ProcessBus>, config: &Config) -> Self {
        Self {
            bus,
            registry_process: config.ao_registry_process.clone(),
            inbox_process: config.ao_inbox_process.clone(),
            chat_process: config.ao_chat_process.clone(),
        }
    }

    /// Spawns a process owned by `address` and announces it to the registry.
    pub async fn create_process(&self, address: &str, mut tags: Vec<Tag>) -> Result<CreatedProcess> {
        if address.trim().is_empty() {
            return Err(AppError::BadRequest("Address is required".to_string()));
        }
        let name = tags
            .iter()
            .find(|tag| tag.name == "Name")
            .map(|tag| tag.value.clone())
            .ok_or_else(|| AppError::BadRequest("Process tags must include Name".to_string()))?;
        tags.push(Tag::new("Pol-User", address.trim()));

        let process_id = self.bus.spawn(tags.clone()).await?;
        tracing::info!("Spawned process {} ({}) for {}", process_id, name, address);

        let announcement = json!({
            "processId": process_id,
            "name": name,
            "tags": tags,
        });
        let message_id = self
            .bus
            .message(
                &self.registry_process,
                action("New-Process"),
                announcement.to_string(),
            )
            .await?;
        tracing::debug!("Registry notified of {} in {}", process_id, message_id);

        Ok(CreatedProcess { process_id, name })
    }

    /// Evaluates `query` read-only against a process.
    pub async fn query_process(&self, process_id: &str, query: &str) -> Result<String> {
        self.bus
            .dryrun(process_id, action("Eval"), query.to_string())
            .await
    }

    /// Sends `code` for evaluation; returns the message id.
    pub async fn run_process(&self, process_id: &str, code: &str) -> Result<String> {
        self.bus
            .message(process_id, action("Eval"), code.to_string())
            .await
    }

    /// Registry entry for `address`, or `[]` when it has none.
    pub async fn user_processes(&self, address: &str) -> Result<Value> {
        let output = self
            .bus
            .dryrun(
                &self.registry_process,
                action("Eval"),
                USER_PROCESSES_QUERY.to_string(),
            )
            .await?;
        let registry: Value = serde_json::from_str(&output)?;
        Ok(registry.get(address.trim()).cloned().unwrap_or_else(|| json!([])))
    }

    pub async fn save_chat(&self, payload: Value) -> Result<Value> {
        let chat_id = payload
            .get("id")
            .or_else(|| payload.get("chatId"))
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!("Saving chat {}", chat_id);

        if let Some(chat_process) = &self.chat_process {
            let message_id = self
                .bus
                .message(chat_process, action("Save-Chat"), payload.to_string())
                .await?;
            tracing::debug!("Chat {} forwarded as {}", chat_id, message_id);
        }
        Ok(payload)
    }

    /// Pending (not yet executed) inbox entries, in inbox order.
    pub async fn read_inbox(&self) -> Result<Vec<InboxMessage>> {
        let output = self
            .bus
            .dryrun(&self.inbox_process, action("Eval"), INBOX_QUERY.to_string())
            .await?;
        parse_inbox(&output)
    }

    pub async fn mark_executed(&self, payload: &Value) -> Result<String> {
        self.bus
            .message(&self.inbox_process, action("Executed"), payload.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockBus;

    fn bridge(bus: Arc<MockBus>, config: &Config) -> ProcessBridge {
        ProcessBridge::new(bus, config)
    }

    #[tokio::test]
    async fn create_process_tags_owner_and_announces_to_registry() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default());
        let bridge = bridge(bus.clone(), &config);

        let created = bridge
            .create_process("0xowner", vec![Tag::new("Name", "my-agent")])
            .await
            .expect("create");

        assert_eq!(created.process_id, MockBus::SPAWNED_PROCESS);
        assert_eq!(created.name, "my-agent");
        let spawned = bus.spawned();
        assert_eq!(spawned.len(), 1);
        assert!(spawned[0].contains(&Tag::new("Pol-User", "0xowner")));

        let messages = bus.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].process_id, config.ao_registry_process);
        assert_eq!(messages[0].tags, action("New-Process"));
        let body: Value = serde_json::from_str(&messages[0].data).expect("json");
        assert_eq!(body["processId"], MockBus::SPAWNED_PROCESS);
        assert_eq!(body["name"], "my-agent");
    }

    #[tokio::test]
    async fn create_process_requires_a_name_tag() {
        let bus = Arc::new(MockBus::default());
        let bridge = bridge(bus.clone(), &Config::for_tests());
        assert!(bridge.create_process("0xowner", vec![]).await.is_err());
        assert!(bus.spawned().is_empty());
    }

    #[tokio::test]
    async fn user_processes_returns_entry_or_empty_list() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default().with_output(
            &config.ao_registry_process,
            r#"{"0xowner": [{"processId": "p1", "name": "agent"}]}"#,
        ));
        let bridge = bridge(bus, &config);

        let found = bridge.user_processes("0xowner").await.expect("processes");
        assert_eq!(found[0]["processId"], "p1");
        let missing = bridge.user_processes("0xother").await.expect("processes");
        assert_eq!(missing, json!([]));
    }

    #[tokio::test]
    async fn query_and_run_use_eval_action() {
        let bus = Arc::new(MockBus::default().with_output("proc", "42"));
        let bridge = bridge(bus.clone(), &Config::for_tests());

        assert_eq!(bridge.query_process("proc", "return 42").await.expect("query"), "42");
        let message_id = bridge.run_process("proc", "x = 1").await.expect("run");
        assert_eq!(message_id, "message-0");
        assert_eq!(bus.dryruns()[0].tags, action("Eval"));
        assert_eq!(bus.messages()[0].data, "x = 1");
    }

    #[tokio::test]
    async fn save_chat_forwards_only_with_chat_process() {
        let mut config = Config::for_tests();
        config.ao_chat_process = None;
        let bus = Arc::new(MockBus::default());
        let payload = json!({"id": "chat-1", "messages": []});

        let saved = bridge(bus.clone(), &config)
            .save_chat(payload.clone())
            .await
            .expect("save");
        assert_eq!(saved, payload);
        assert!(bus.messages().is_empty());

        config.ao_chat_process = Some("chat-proc".to_string());
        bridge(bus.clone(), &config)
            .save_chat(payload)
            .await
            .expect("save");
        assert_eq!(bus.messages()[0].process_id, "chat-proc");
        assert_eq!(bus.messages()[0].tags, action("Save-Chat"));
    }

    #[tokio::test]
    async fn read_inbox_filters_executed_entries() {
        let config = Config::for_tests();
        let bus = Arc::new(MockBus::default().with_output(
            &config.ao_inbox_process,
            r#"[
                {"id": "a", "timestamp": 1700000000000, "data": "{}", "from": "x"},
                {"id": "b", "timestamp": 1700000001000, "data": "{}", "executed": true}
            ]"#,
        ));
        let inbox = bridge(bus, &config).read_inbox().await.expect("inbox");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, "a");
    }
}
