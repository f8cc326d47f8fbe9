// src/models/mod.rs
pub mod account;
pub mod inbox;
pub mod trade;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use account::{AccountMetadata, AccountRecord, IndexedNft};
pub use inbox::{parse_inbox, InboxMessage, InboxOrder};
pub use trade::{
    LegQuote, PriceEntry, QuoteSummary, SwapInstruction, SwapOutcome, SwapRoute, TokenDescriptor,
};

use serde::{Deserialize, Serialize};

/// AO message tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
