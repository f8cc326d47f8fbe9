use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::{
    error::{AppError, Result},
    models::TokenDescriptor,
    utils::parse_address,
};

#[derive(Debug, Deserialize)]
struct TokenListEntry {
    symbol: String,
    address: String,
    decimals: u8,
}

/// Static symbol -> token lookup loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<TokenDescriptor>,
    by_symbol: HashMap<String, usize>,
}

impl TokenRegistry {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read token list {}: {}", path.display(), e))?;
        let registry = Self::from_json(&raw)?;
        if registry.is_empty() {
            anyhow::bail!("Token list {} is empty", path.display());
        }
        tracing::info!(
            "Loaded {} tokens from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<TokenListEntry> = serde_json::from_str(raw)?;
        let mut tokens = Vec::with_capacity(entries.len());
        for entry in entries {
            let symbol = entry.symbol.trim().to_string();
            if symbol.is_empty() {
                return Err(AppError::Internal("Token list has an empty symbol".to_string()));
            }
            tokens.push(TokenDescriptor {
                address: parse_address(&entry.address, &symbol)
                    .map_err(|e| AppError::Internal(e.to_string()))?,
                symbol,
                decimals: entry.decimals,
            });
        }
        Self::new(tokens)
    }

    pub fn new(tokens: Vec<TokenDescriptor>) -> Result<Self> {
        let mut by_symbol = HashMap::with_capacity(tokens.len());
        for (idx, token) in tokens.iter().enumerate() {
            if by_symbol.insert(token.symbol.clone(), idx).is_some() {
                return Err(AppError::Internal(format!(
                    "Duplicate token symbol in list: {}",
                    token.symbol
                )));
            }
        }
        Ok(Self { tokens, by_symbol })
    }

    /// Exact-case symbol lookup.
    pub fn get(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.by_symbol.get(symbol).map(|idx| &self.tokens[*idx])
    }

    pub fn resolve(&self, symbol: &str) -> Result<TokenDescriptor> {
        self.get(symbol.trim())
            .cloned()
            .ok_or_else(|| AppError::InvalidToken(symbol.to_string()))
    }

    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
