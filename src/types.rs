//! Core data structures
//!
//! Token descriptors, pool kinds, pool references and point-in-time pool
//! snapshots shared by the price engine, the tick scanner and the reader.
//!
//! Created: 2026-10-15

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ERC-20 descriptor. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

impl TokenInfo {
    pub fn new(address: Address, decimals: u8, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address,
            decimals,
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

/// Raw metadata as read from the token contract.
/// `symbol()`/`name()` are optional on non-standard tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub decimals: u8,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

/// Pricing model of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Uniswap V2 style, x * y = k
    ConstantProduct,
    /// Uniswap V3 style, tick-based
    ConcentratedLiquidity,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolKind::ConstantProduct => write!(f, "ConstantProduct"),
            PoolKind::ConcentratedLiquidity => write!(f, "ConcentratedLiquidity"),
        }
    }
}

/// What a reader is constructed with, before anything has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    pub address: Address,
    pub kind: PoolKind,
    /// Fee tier in hundredths of a bip (500 = 0.05%). Read from the pool when absent.
    pub fee: Option<u32>,
}

impl PoolSpec {
    pub fn constant_product(address: Address) -> Self {
        Self {
            address,
            kind: PoolKind::ConstantProduct,
            fee: None,
        }
    }

    pub fn concentrated(address: Address, fee: Option<u32>) -> Self {
        Self {
            address,
            kind: PoolKind::ConcentratedLiquidity,
            fee,
        }
    }
}

/// A pool of interest together with its token descriptors.
/// Built on the first successful refresh and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReference {
    pub address: Address,
    pub kind: PoolKind,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    pub fee: Option<u32>,
}

impl PoolReference {
    /// "SYM0/SYM1"
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.token0.symbol, self.token1.symbol)
    }

    pub fn contains(&self, token: Address) -> bool {
        self.token0.address == token || self.token1.address == token
    }
}

/// State of the `slot0`/liquidity side of a concentrated-liquidity pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConcentratedState {
    /// sqrt(price) as a Q64.96 fixed point number
    pub sqrt_price_x96: U256,
    /// In-range liquidity
    pub liquidity: u128,
    pub tick: i32,
    pub tick_spacing: i32,
}

/// Point-in-time read of a pool. Always reflects the latest refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolSnapshot {
    ConstantProduct { reserve0: U256, reserve1: U256 },
    ConcentratedLiquidity(ConcentratedState),
}

impl PoolSnapshot {
    pub fn kind(&self) -> PoolKind {
        match self {
            PoolSnapshot::ConstantProduct { .. } => PoolKind::ConstantProduct,
            PoolSnapshot::ConcentratedLiquidity(_) => PoolKind::ConcentratedLiquidity,
        }
    }
}

/// Both directional prices of a pair. `None` means unavailable (zero liquidity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairPrice {
    /// Price of one token0 expressed in token1
    pub token0_in_token1: Option<f64>,
    /// Price of one token1 expressed in token0
    pub token1_in_token0: Option<f64>,
}

impl PairPrice {
    pub const UNAVAILABLE: PairPrice = PairPrice {
        token0_in_token1: None,
        token1_in_token0: None,
    };
}
