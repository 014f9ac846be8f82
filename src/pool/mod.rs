//! Pool module
//!
//! Price engine, tick bitmap scanner, token metadata cache and the pool
//! state reader that composes them. Supports both constant-product and
//! concentrated-liquidity pools.
//!
//! Created: 2026-10-15

pub mod price;
pub mod reader;
pub mod tick_bitmap;
pub mod tokens;

pub use price::{concentrated_price, constant_product_price, normalize};
pub use reader::{discover_pool, PoolStateReader};
pub use tick_bitmap::{word_index, TickBitmapScanner, TickBitmapWord, TickScan, MAX_TICK, MIN_TICK};
pub use tokens::{StaticTokenList, SymbolResolver, TokenCache};

use crate::chain::ChainReader;
use crate::error::ArbError;
use crate::types::PoolSnapshot;
use futures::future::join_all;

/// Refresh every reader concurrently. Readers share no mutable state, so
/// one failure does not affect the others; results are in reader order.
pub async fn refresh_all<C>(readers: &mut [PoolStateReader<C>]) -> Vec<Result<PoolSnapshot, ArbError>>
where
    C: ChainReader + ?Sized,
{
    join_all(readers.iter_mut().map(|reader| reader.refresh())).await
}
