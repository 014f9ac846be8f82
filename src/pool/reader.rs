//! Pool State Reader
//!
//! One reader per pool of interest, for either pricing model. `refresh()`
//! performs every dependent read and must succeed before any price query
//! is answered; a query on an unrefreshed (or failed) reader is a
//! `StaleRead` error, never a stale or zero price.
//!
//! Token descriptors and the fee tier are read once; reserves or slot0 are
//! read on every refresh.
//!
//! Created: 2026-10-15

use super::price::{self, constant_product_price, concentrated_price};
use super::tick_bitmap::{TickBitmapScanner, TickScan};
use super::tokens::TokenCache;
use crate::chain::ChainReader;
use crate::error::{ArbError, ConfigError};
use crate::types::{PairPrice, PoolKind, PoolReference, PoolSnapshot, PoolSpec};
use alloy::primitives::Address;
use tracing::debug;

/// Refreshing, caching view of a single pool
pub struct PoolStateReader<C: ?Sized> {
    spec: PoolSpec,
    tokens: TokenCache<C>,
    reference: Option<PoolReference>,
    snapshot: Option<PoolSnapshot>,
}

impl<C: ChainReader + ?Sized> PoolStateReader<C> {
    pub fn new(spec: PoolSpec, tokens: TokenCache<C>) -> Self {
        Self {
            spec,
            tokens,
            reference: None,
            snapshot: None,
        }
    }

    pub fn address(&self) -> Address {
        self.spec.address
    }

    pub fn kind(&self) -> PoolKind {
        self.spec.kind
    }

    /// Pool reference, available after the first successful refresh
    pub fn reference(&self) -> Option<&PoolReference> {
        self.reference.as_ref()
    }

    /// Latest snapshot, `None` before a refresh or after a failed one
    pub fn snapshot(&self) -> Option<&PoolSnapshot> {
        self.snapshot.as_ref()
    }

    /// Read the pool's current state.
    ///
    /// The previous snapshot is discarded up front, so a failed refresh
    /// leaves the reader unusable for price queries until the next success.
    pub async fn refresh(&mut self) -> Result<PoolSnapshot, ArbError> {
        self.snapshot = None;

        if self.reference.is_none() {
            self.reference = Some(self.load_reference().await?);
        }

        let source = self.tokens.source();
        let snapshot = match self.spec.kind {
            PoolKind::ConstantProduct => {
                let (reserve0, reserve1) = source.reserves(self.spec.address).await?;
                PoolSnapshot::ConstantProduct { reserve0, reserve1 }
            }
            PoolKind::ConcentratedLiquidity => {
                PoolSnapshot::ConcentratedLiquidity(source.concentrated_state(self.spec.address).await?)
            }
        };

        debug!("Refreshed {:?} ({}): {:?}", self.spec.address, self.spec.kind, snapshot);

        self.snapshot = Some(snapshot);
        Ok(snapshot)
    }

    async fn load_reference(&self) -> Result<PoolReference, ArbError> {
        let source = self.tokens.source();
        let (token0, token1) = source.pool_tokens(self.spec.address).await?;

        let fee = match (self.spec.kind, self.spec.fee) {
            (PoolKind::ConcentratedLiquidity, None) => Some(source.pool_fee(self.spec.address).await?),
            (_, fee) => fee,
        };

        let (token0, token1) = tokio::try_join!(self.tokens.get(token0), self.tokens.get(token1))?;

        let reference = PoolReference {
            address: self.spec.address,
            kind: self.spec.kind,
            token0,
            token1,
            fee,
        };
        debug!("Loaded pool {} at {:?} (fee {:?})", reference.symbol(), reference.address, fee);
        Ok(reference)
    }

    fn current(&self) -> Result<(&PoolReference, &PoolSnapshot), ArbError> {
        match (&self.reference, &self.snapshot) {
            (Some(reference), Some(snapshot)) => Ok((reference, snapshot)),
            _ => Err(ArbError::StaleRead(self.spec.address)),
        }
    }

    /// Both directional prices from the latest snapshot.
    pub fn price(&self) -> Result<PairPrice, ArbError> {
        let (reference, snapshot) = self.current()?;
        let (d0, d1) = (reference.token0.decimals, reference.token1.decimals);

        Ok(match snapshot {
            PoolSnapshot::ConstantProduct { reserve0, reserve1 } => {
                constant_product_price(*reserve0, *reserve1, d0, d1)
            }
            PoolSnapshot::ConcentratedLiquidity(state) => concentrated_price(state.sqrt_price_x96, d0, d1),
        })
    }

    /// Price of one unit of the token named `symbol` in the other token.
    pub fn price_of(&self, symbol: &str) -> Result<Option<f64>, ArbError> {
        let price = self.price()?;
        let (reference, _) = self.current()?;
        price::price_of(reference, &price, symbol)
    }

    /// Price of one `base` in `quote` units if this pool holds exactly that pair.
    pub fn rate(&self, base: Address, quote: Address) -> Result<Option<f64>, ArbError> {
        let price = self.price()?;
        let (reference, _) = self.current()?;

        Ok(if reference.token0.address == base && reference.token1.address == quote {
            price.token0_in_token1
        } else if reference.token1.address == base && reference.token0.address == quote {
            price.token1_in_token0
        } else {
            None
        })
    }

    /// Initialized ticks of a concentrated-liquidity pool, using the tick
    /// spacing from the latest snapshot.
    pub async fn scan_ticks(&self, batch_size: usize) -> Result<TickScan, ArbError> {
        if self.spec.kind != PoolKind::ConcentratedLiquidity {
            return Err(ConfigError::NotConcentrated(self.spec.address).into());
        }
        let spacing = match self.current()? {
            (_, PoolSnapshot::ConcentratedLiquidity(state)) => state.tick_spacing,
            _ => return Err(ConfigError::NotConcentrated(self.spec.address).into()),
        };

        TickBitmapScanner::new(spacing)?
            .with_batch_size(batch_size)
            .scan(self.tokens.source().as_ref(), self.spec.address)
            .await
    }
}

/// Resolve a pool address through its factory.
///
/// `fee` is required for concentrated-liquidity pools. A zero address from
/// the factory means the pool does not exist.
pub async fn discover_pool<C: ChainReader + ?Sized>(
    source: &C,
    factory: Address,
    kind: PoolKind,
    token_a: Address,
    token_b: Address,
    fee: Option<u32>,
) -> Result<PoolSpec, ArbError> {
    let describe = || format!("{:?}/{:?} ({}, fee {:?}) on factory {:?}", token_a, token_b, kind, fee, factory);

    let address = match kind {
        PoolKind::ConstantProduct => source.find_constant_product_pool(factory, token_a, token_b).await?,
        PoolKind::ConcentratedLiquidity => {
            let fee = fee.ok_or_else(|| ConfigError::PoolNotFound(describe()))?;
            source.find_concentrated_pool(factory, token_a, token_b, fee).await?
        }
    };

    let address = address.ok_or_else(|| ConfigError::PoolNotFound(describe()))?;
    debug!("Discovered {} pool {:?}", kind, address);

    Ok(PoolSpec { address, kind, fee })
}
