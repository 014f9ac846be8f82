//! Chain Data Source
//!
//! The read side of the chain as the core sees it. Pool readers, the tick
//! scanner and the balance accountant only talk to [`ChainReader`], so the
//! RPC transport can be swapped for an in-memory source in tests.

pub mod rpc;
pub mod tx;

#[cfg(test)]
pub(crate) mod mock;

pub use rpc::RpcChainReader;
pub use tx::{confirm, wait_for_receipt};

use crate::error::ArbError;
use crate::types::{ConcentratedState, TokenMetadata};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;

/// Read-only chain access needed by the pricing and scanning core.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `decimals()`, `symbol()` and `name()` of an ERC-20.
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ArbError>;

    /// `balanceOf(holder)` in raw token units for every `(token, holder)`
    /// pair, in the order given. All pairs are read against the same block.
    async fn balances_of(&self, pairs: &[(Address, Address)]) -> Result<Vec<U256>, ArbError>;

    /// `(token0, token1)` of a pool of either kind.
    async fn pool_tokens(&self, pool: Address) -> Result<(Address, Address), ArbError>;

    /// Fee tier of a concentrated-liquidity pool.
    async fn pool_fee(&self, pool: Address) -> Result<u32, ArbError>;

    /// Raw `(reserve0, reserve1)` of a constant-product pool.
    async fn reserves(&self, pool: Address) -> Result<(U256, U256), ArbError>;

    /// `slot0`, liquidity and tick spacing of a concentrated-liquidity pool.
    async fn concentrated_state(&self, pool: Address) -> Result<ConcentratedState, ArbError>;

    /// `tickBitmap(word)` for each word, in the order given.
    /// One call is one batched request; callers fan out across calls.
    async fn tick_bitmap_words(&self, pool: Address, words: &[i16]) -> Result<Vec<U256>, ArbError>;

    /// Factory lookup for a concentrated-liquidity pool. `None` if it does not exist.
    async fn find_concentrated_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Option<Address>, ArbError>;

    /// Factory lookup for a constant-product pair. `None` if it does not exist.
    async fn find_constant_product_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ArbError>;
}
