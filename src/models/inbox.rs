use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::{AppError, Result};

// ==================== RAW INBOX ====================
/// Entry as stored in the process's `Inbox_data` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInboxEntry {
    pub id: String,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboxMessage {
    pub id: String,
    pub timestamp: i64,
    pub data: String,
    pub from: String,
    pub readable_time: String,
}

impl From<RawInboxEntry> for InboxMessage {
    fn from(raw: RawInboxEntry) -> Self {
        let timestamp = match &raw.timestamp {
            Value::Number(n) => n.as_i64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        };
        let readable_time = Utc
            .timestamp_millis_opt(timestamp)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();

        Self {
            id: raw.id,
            timestamp,
            data: raw.data,
            from: raw.from.unwrap_or_else(|| "Unknown".to_string()),
            readable_time,
        }
    }
}

/// Parses the dry-run output of the inbox table, dropping executed entries.
pub fn parse_inbox(raw: &str) -> Result<Vec<InboxMessage>> {
    let entries: Vec<RawInboxEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .filter(|entry| !entry.executed)
        .map(InboxMessage::from)
        .collect())
}

// ==================== ORDERS ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOperation {
    Buy,
    Sell,
}

impl FromStr for OrderOperation {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "buy" => Ok(OrderOperation::Buy),
            "sell" => Ok(OrderOperation::Sell),
            other => Err(AppError::BadRequest(format!("Invalid operation: {}", other))),
        }
    }
}

/// Order carried in an inbox message's `data`. `fields` keeps the raw
/// JSON object so it can be echoed back once executed.
#[derive(Debug, Clone)]
pub struct InboxOrder {
    pub account: String,
    pub operation: OrderOperation,
    pub symbol: String,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub fields: Map<String, Value>,
}

impl InboxOrder {
    pub fn parse(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        let Value::Object(fields) = value else {
            return Err(AppError::BadRequest(
                "Inbox order must be a JSON object".to_string(),
            ));
        };

        let account = string_field(&fields, "account")?;
        let operation = string_field(&fields, "operation")?.parse()?;
        let symbol = string_field(&fields, "symbol")?;
        let amount = decimal_field(&fields, "amount")?
            .ok_or_else(|| AppError::BadRequest("Inbox order is missing amount".to_string()))?;
        let price = decimal_field(&fields, "price")?;

        Ok(Self {
            account,
            operation,
            symbol,
            amount,
            price,
            fields,
        })
    }

    /// Returns `(token_in, token_out)` symbols for this order against `base`.
    pub fn token_pair(&self, base: &str) -> (String, String) {
        match self.operation {
            OrderOperation::Sell => (self.symbol.clone(), base.to_string()),
            OrderOperation::Buy => (base.to_string(), self.symbol.clone()),
        }
    }

    /// Sell orders spend `amount` of the symbol; buy orders spend `amount / price`
    /// of the base token. Both are rounded to 3 places.
    pub fn amount_in(&self) -> Result<Decimal> {
        let raw = match self.operation {
            OrderOperation::Sell => self.amount,
            OrderOperation::Buy => {
                let price = self
                    .price
                    .filter(|p| !p.is_zero())
                    .ok_or_else(|| AppError::BadRequest("Buy order needs a price".to_string()))?;
                self.amount
                    .checked_div(price)
                    .ok_or_else(|| AppError::BadRequest("Invalid order price".to_string()))?
            }
        };
        Ok(crate::utils::round_decimal(raw, 3))
    }

    pub fn executed_payload(&self, message: &InboxMessage, tx_hash: &str) -> Value {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(message.id.clone()));
        fields.insert("timestamp".to_string(), Value::from(message.timestamp));
        fields.insert("txHash".to_string(), Value::String(tx_hash.to_string()));
        Value::Object(fields)
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Inbox order is missing {}", name)))
}

fn decimal_field(fields: &Map<String, Value>, name: &str) -> Result<Option<Decimal>> {
    let parsed = match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(crate::utils::parse_decimal(s)?),
        Some(Value::Number(n)) => Some(crate::utils::parse_decimal(&n.to_string())?),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Invalid {} in inbox order: {}",
                name, other
            )))
        }
    };
    Ok(parsed)
}
