//! AMM Flash Arbitrage Library
//!
//! Reads constant-product and concentrated-liquidity pool state, prices
//! pairs across decimal scales, enumerates initialized ticks and runs
//! flash-loan funded (or wallet-funded) swap cycles with balance-based
//! settlement.
//!
//! Created: 2026-10-15

pub mod arbitrage;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod pool;
pub mod types;

// Re-export commonly used types
pub use arbitrage::{ArbitrageOrchestrator, ArbitragePlan, ArbitrageResult, Verdict, WalletArbitrage, WalletRunResult};
pub use chain::{ChainReader, RpcChainReader};
pub use config::{load_config, ArbConfig, BotConfig};
pub use error::{ArbError, ConfigError};
pub use pool::{PoolStateReader, TickBitmapScanner, TokenCache};
pub use types::{PairPrice, PoolKind, PoolReference, PoolSnapshot, PoolSpec, TokenInfo};
