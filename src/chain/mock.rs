//! In-memory [`ChainReader`] for unit tests.

use super::ChainReader;
use crate::error::ArbError;
use crate::types::{ConcentratedState, TokenMetadata};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockChain {
    tokens: Mutex<HashMap<Address, TokenMetadata>>,
    balances: Mutex<HashMap<(Address, Address), U256>>,
    pool_tokens: Mutex<HashMap<Address, (Address, Address)>>,
    fees: Mutex<HashMap<Address, u32>>,
    reserves: Mutex<HashMap<Address, (U256, U256)>>,
    concentrated: Mutex<HashMap<Address, ConcentratedState>>,
    bitmaps: Mutex<HashMap<(Address, i16), U256>>,
    factory_pools: Mutex<HashMap<(Address, Address, Address, Option<u32>), Address>>,
    failing: Mutex<Vec<Address>>,
    pub bitmap_batches: AtomicUsize,
    pub balance_batches: AtomicUsize,
    pub metadata_reads: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: Address, decimals: u8, symbol: Option<&str>) -> Self {
        self.tokens.lock().unwrap().insert(
            token,
            TokenMetadata {
                decimals,
                symbol: symbol.map(str::to_string),
                name: symbol.map(|s| format!("{} Token", s)),
            },
        );
        self
    }

    pub fn with_constant_product(self, pool: Address, tokens: (Address, Address), reserves: (U256, U256)) -> Self {
        self.pool_tokens.lock().unwrap().insert(pool, tokens);
        self.reserves.lock().unwrap().insert(pool, reserves);
        self
    }

    pub fn with_concentrated(self, pool: Address, tokens: (Address, Address), fee: u32, state: ConcentratedState) -> Self {
        self.pool_tokens.lock().unwrap().insert(pool, tokens);
        self.fees.lock().unwrap().insert(pool, fee);
        self.concentrated.lock().unwrap().insert(pool, state);
        self
    }

    pub fn with_bitmap_word(self, pool: Address, word: i16, bitmap: U256) -> Self {
        self.bitmaps.lock().unwrap().insert((pool, word), bitmap);
        self
    }

    pub fn with_factory_pool(
        self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: Option<u32>,
        pool: Address,
    ) -> Self {
        self.factory_pools
            .lock()
            .unwrap()
            .insert((factory, token_a, token_b, fee), pool);
        self
    }

    /// Every read against `target` (pool or token) fails from now on.
    pub fn fail_reads_of(&self, target: Address) {
        self.failing.lock().unwrap().push(target);
    }

    pub fn set_reserves(&self, pool: Address, reserves: (U256, U256)) {
        self.reserves.lock().unwrap().insert(pool, reserves);
    }

    pub fn set_balance(&self, token: Address, holder: Address, amount: U256) {
        self.balances.lock().unwrap().insert((token, holder), amount);
    }

    pub fn credit(&self, token: Address, holder: Address, amount: U256) {
        let mut balances = self.balances.lock().unwrap();
        let entry = balances.entry((token, holder)).or_insert(U256::ZERO);
        *entry += amount;
    }

    pub fn debit(&self, token: Address, holder: Address, amount: U256) {
        let mut balances = self.balances.lock().unwrap();
        let entry = balances.entry((token, holder)).or_insert(U256::ZERO);
        *entry = entry.saturating_sub(amount);
    }

    fn check(&self, target: Address, what: &str) -> Result<(), ArbError> {
        if self.failing.lock().unwrap().contains(&target) {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "mock transport failure");
            return Err(ArbError::external(format!("{} of {}", what, target))(io));
        }
        Ok(())
    }

    fn missing(what: &str, target: Address) -> ArbError {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "execution reverted");
        ArbError::external(format!("{} of {}", what, target))(io)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ArbError> {
        self.check(token, "decimals()")?;
        self.metadata_reads.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or_else(|| Self::missing("decimals()", token))
    }

    async fn balances_of(&self, pairs: &[(Address, Address)]) -> Result<Vec<U256>, ArbError> {
        for &(token, _) in pairs {
            self.check(token, "balanceOf()")?;
        }
        self.balance_batches.fetch_add(1, Ordering::SeqCst);
        let balances = self.balances.lock().unwrap();
        Ok(pairs
            .iter()
            .map(|pair| balances.get(pair).copied().unwrap_or(U256::ZERO))
            .collect())
    }

    async fn pool_tokens(&self, pool: Address) -> Result<(Address, Address), ArbError> {
        self.check(pool, "token0()")?;
        self.pool_tokens
            .lock()
            .unwrap()
            .get(&pool)
            .copied()
            .ok_or_else(|| Self::missing("token0()", pool))
    }

    async fn pool_fee(&self, pool: Address) -> Result<u32, ArbError> {
        self.check(pool, "fee()")?;
        self.fees
            .lock()
            .unwrap()
            .get(&pool)
            .copied()
            .ok_or_else(|| Self::missing("fee()", pool))
    }

    async fn reserves(&self, pool: Address) -> Result<(U256, U256), ArbError> {
        self.check(pool, "getReserves()")?;
        self.reserves
            .lock()
            .unwrap()
            .get(&pool)
            .copied()
            .ok_or_else(|| Self::missing("getReserves()", pool))
    }

    async fn concentrated_state(&self, pool: Address) -> Result<ConcentratedState, ArbError> {
        self.check(pool, "slot0()")?;
        self.concentrated
            .lock()
            .unwrap()
            .get(&pool)
            .copied()
            .ok_or_else(|| Self::missing("slot0()", pool))
    }

    async fn tick_bitmap_words(&self, pool: Address, words: &[i16]) -> Result<Vec<U256>, ArbError> {
        self.check(pool, "tickBitmap()")?;
        self.bitmap_batches.fetch_add(1, Ordering::SeqCst);
        let bitmaps = self.bitmaps.lock().unwrap();
        Ok(words
            .iter()
            .map(|w| bitmaps.get(&(pool, *w)).copied().unwrap_or(U256::ZERO))
            .collect())
    }

    async fn find_concentrated_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Option<Address>, ArbError> {
        let pools = self.factory_pools.lock().unwrap();
        Ok(pools
            .get(&(factory, token_a, token_b, Some(fee)))
            .or_else(|| pools.get(&(factory, token_b, token_a, Some(fee))))
            .copied())
    }

    async fn find_constant_product_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ArbError> {
        let pools = self.factory_pools.lock().unwrap();
        Ok(pools
            .get(&(factory, token_a, token_b, None))
            .or_else(|| pools.get(&(factory, token_b, token_a, None)))
            .copied())
    }
}
