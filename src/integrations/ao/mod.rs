pub mod client;
pub mod data_item;

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Result, models::Tag};

pub use client::AoClient;

/// Messaging surface of the AO compute network used by the service.
#[async_trait]
pub trait ProcessBus: Send + Sync {
    /// Spawns a process from the configured module and scheduler; returns its id.
    async fn spawn(&self, tags: Vec<Tag>) -> Result<String>;

    /// Sends a signed message; returns the message id.
    async fn message(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String>;

    /// Evaluates a message without persisting it; returns the output string.
    async fn dryrun(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String>;

    /// Reads the compute result of a previously sent message.
    async fn result(&self, process_id: &str, message_id: &str) -> Result<Value>;
}

pub fn action(name: &str) -> Vec<Tag> {
    vec![Tag::new("Action", name)]
}
