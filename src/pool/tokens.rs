//! Token Metadata
//!
//! Thread-safe cache of ERC-20 descriptors using DashMap. Decimals, symbol
//! and name never change after deployment, so each token is read from the
//! chain at most once per cache.
//!
//! Tokens without a readable `symbol()` are labelled through an injected
//! [`SymbolResolver`], falling back to the checksummed address.
//!
//! Created: 2026-10-15

use crate::chain::ChainReader;
use crate::error::ArbError;
use crate::types::TokenInfo;
use alloy::primitives::Address;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Address to symbol lookup, for tokens whose contract does not answer `symbol()`.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, token: Address) -> Option<String>;
}

/// Fixed address → symbol list, usually built from the `[[tokens]]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenList {
    symbols: HashMap<Address, String>,
}

impl StaticTokenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: Address, symbol: impl Into<String>) -> Self {
        self.symbols.insert(token, symbol.into());
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<(Address, String)> for StaticTokenList {
    fn from_iter<I: IntoIterator<Item = (Address, String)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}

impl SymbolResolver for StaticTokenList {
    fn resolve(&self, token: Address) -> Option<String> {
        self.symbols.get(&token).cloned()
    }
}

/// Shared token descriptor cache
pub struct TokenCache<C: ?Sized> {
    source: Arc<C>,
    tokens: Arc<DashMap<Address, TokenInfo>>,
    resolver: Option<Arc<dyn SymbolResolver>>,
}

impl<C: ?Sized> Clone for TokenCache<C> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            tokens: Arc::clone(&self.tokens),
            resolver: self.resolver.clone(),
        }
    }
}

impl<C: ChainReader + ?Sized> TokenCache<C> {
    pub fn new(source: Arc<C>) -> Self {
        Self {
            source,
            tokens: Arc::new(DashMap::new()),
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn SymbolResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn source(&self) -> &Arc<C> {
        &self.source
    }

    /// Descriptor of `token`, read from the chain on first use.
    pub async fn get(&self, token: Address) -> Result<TokenInfo, ArbError> {
        if let Some(info) = self.tokens.get(&token) {
            return Ok(info.clone());
        }

        let metadata = self.source.token_metadata(token).await?;

        let symbol = match metadata.symbol {
            Some(symbol) => symbol,
            None => {
                let label = self
                    .resolver
                    .as_ref()
                    .and_then(|r| r.resolve(token))
                    .unwrap_or_else(|| token.to_checksum(None));
                warn!("⚠️  symbol() unavailable for {}, using label {}", token, label);
                label
            }
        };
        let name = metadata.name.unwrap_or_else(|| symbol.clone());

        let info = TokenInfo::new(token, metadata.decimals, symbol, name);
        debug!("Cached token {:?}: {} ({} decimals)", token, info, info.decimals);

        // a concurrent fetch of the same token may have won; both read the same immutable data
        let entry = self.tokens.entry(token).or_insert(info);
        Ok(entry.value().clone())
    }

    /// Descriptors for several tokens, fetched concurrently.
    pub async fn get_many(&self, tokens: &[Address]) -> Result<Vec<TokenInfo>, ArbError> {
        futures::future::try_join_all(tokens.iter().map(|&t| self.get(t))).await
    }

    pub fn cached(&self, token: Address) -> Option<TokenInfo> {
        self.tokens.get(&token).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
