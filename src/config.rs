//! Configuration management
//!
//! Connection settings come from the environment (`.env` via dotenv); pools,
//! tokens and the arbitrage plan come from a TOML file.
//!
//! Created: 2026-10-15

use crate::arbitrage::{ArbitragePlan, SwapLeg, Venue, VenueKind};
use crate::contracts::MULTICALL3_ADDRESS;
use crate::pool::tick_bitmap::DEFAULT_BATCH_SIZE;
use crate::pool::StaticTokenList;
use crate::types::{PoolKind, PoolSpec};
use alloy::primitives::utils::parse_units;
use alloy::primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment-driven connection settings
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Only needed to submit transactions
    pub private_key: Option<String>,
    pub multicall: Address,
    pub tick_batch_size: usize,
    pub confirmation_timeout: Duration,
}

/// Load [`BotConfig`] from the process environment and `.env`.
pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();
    BotConfig::from_lookup(|key| std::env::var(key).ok())
}

impl BotConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup("RPC_URL").context("RPC_URL not set")?;

        let chain_id = match lookup("CHAIN_ID") {
            Some(v) => v.parse().with_context(|| format!("Invalid CHAIN_ID: {}", v))?,
            None => 1,
        };

        let multicall = match lookup("MULTICALL3_ADDRESS") {
            Some(v) => Address::from_str(&v).with_context(|| format!("Invalid MULTICALL3_ADDRESS: {}", v))?,
            None => MULTICALL3_ADDRESS,
        };

        let tick_batch_size = match lookup("TICK_BATCH_SIZE") {
            Some(v) => v.parse().with_context(|| format!("Invalid TICK_BATCH_SIZE: {}", v))?,
            None => DEFAULT_BATCH_SIZE,
        };

        let confirmation_timeout = match lookup("CONFIRMATION_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("Invalid CONFIRMATION_TIMEOUT_SECS: {}", v))?,
            ),
            None => crate::chain::tx::DEFAULT_CONFIRMATION_TIMEOUT,
        };

        Ok(Self {
            rpc_url,
            chain_id,
            private_key: lookup("PRIVATE_KEY").filter(|k| !k.is_empty()),
            multicall,
            tick_batch_size,
            confirmation_timeout,
        })
    }
}

/// Top-level TOML configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct ArbConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
    #[serde(default)]
    pub pools: Vec<PoolEntry>,
    pub arbitrage: Option<ArbitrageConfig>,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Symbol whose price is reported for each pool
    #[serde(default = "default_reference_symbol")]
    pub reference_symbol: String,
    #[serde(default)]
    pub scan_ticks: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            reference_symbol: default_reference_symbol(),
            scan_ticks: false,
        }
    }
}

fn default_reference_symbol() -> String { "WETH".to_string() }

/// Static symbol for tokens that do not answer `symbol()`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub address: Address,
    pub symbol: String,
}

/// A pool, either by address or by factory lookup
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEntry {
    pub kind: PoolKind,
    pub address: Option<Address>,
    pub factory: Option<Address>,
    pub token_a: Option<Address>,
    pub token_b: Option<Address>,
    pub fee: Option<u32>,
}

/// Where a configured pool comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSource {
    Direct(PoolSpec),
    Factory {
        factory: Address,
        kind: PoolKind,
        token_a: Address,
        token_b: Address,
        fee: Option<u32>,
    },
}

impl PoolEntry {
    pub fn source(&self) -> Result<PoolSource> {
        if let Some(address) = self.address {
            return Ok(PoolSource::Direct(PoolSpec {
                address,
                kind: self.kind,
                fee: self.fee,
            }));
        }

        match (self.factory, self.token_a, self.token_b) {
            (Some(factory), Some(token_a), Some(token_b)) => {
                if self.kind == PoolKind::ConcentratedLiquidity && self.fee.is_none() {
                    bail!("Concentrated-liquidity pool lookup on {} needs a fee", factory);
                }
                Ok(PoolSource::Factory {
                    factory,
                    kind: self.kind,
                    token_a,
                    token_b,
                    fee: self.fee,
                })
            }
            _ => bail!("Pool entry needs either `address` or `factory`, `token_a` and `token_b`"),
        }
    }
}

/// How the loan is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanMode {
    /// Deployed receiver contract borrows and swaps on-chain
    #[default]
    FlashContract,
    /// Nothing is borrowed: the wallet spends its own balance of the loan
    /// asset and swaps through the routers, one confirmed transaction per leg
    Wallet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: LoanMode,
    pub loan_asset: Address,
    /// Human units of the loan asset, e.g. "1.5"
    pub amount: String,
    pub receiver: Address,
    /// Balance holders to track besides the wallet and the receiver
    #[serde(default)]
    pub holders: Vec<Address>,
    pub legs: Vec<LegEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegEntry {
    pub token_in: Address,
    pub token_out: Address,
    pub venue: VenueKind,
    pub router: Address,
    pub fee: Option<u32>,
}

impl ArbitrageConfig {
    /// Build the plan, scaling `amount` by the loan asset's decimals.
    pub fn to_plan(&self, loan_decimals: u8) -> Result<ArbitragePlan> {
        let amount = parse_units(&self.amount, loan_decimals)
            .map_err(|e| anyhow!("Invalid loan amount {:?}: {}", self.amount, e))?
            .get_absolute();

        let plan = ArbitragePlan {
            loan_asset: self.loan_asset,
            amount,
            legs: self
                .legs
                .iter()
                .map(|leg| SwapLeg {
                    token_in: leg.token_in,
                    token_out: leg.token_out,
                    venue: Venue {
                        kind: leg.venue,
                        router: leg.router,
                    },
                    fee: leg.fee,
                })
                .collect(),
        };

        plan.validate().context("Invalid arbitrage plan")?;
        Ok(plan)
    }
}

impl ArbConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;

        for (i, pool) in config.pools.iter().enumerate() {
            pool.source().with_context(|| format!("pools[{}]", i))?;
        }
        Ok(config)
    }

    pub fn token_list(&self) -> StaticTokenList {
        self.tokens
            .iter()
            .map(|t| (t.address, t.symbol.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[general]
reference_symbol = "WETH"
scan_ticks = true

[[tokens]]
address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
symbol = "WETH"

[[pools]]
kind = "constant_product"
address = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc"

[[pools]]
kind = "concentrated_liquidity"
factory = "0x1F98431c8aD98523631AE4a59f267346ea31F984"
token_a = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
token_b = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
fee = 500

[arbitrage]
enabled = true
mode = "wallet"
loan_asset = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
amount = "1.5"
receiver = "0x0000000000000000000000000000000000000088"

[[arbitrage.legs]]
token_in = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
token_out = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
venue = "concentrated_liquidity_router"
router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
fee = 500

[[arbitrage.legs]]
token_in = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
token_out = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
venue = "constant_product_router"
router = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
"#;

    const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    #[test]
    fn test_parse_sample() {
        let config = ArbConfig::from_toml(SAMPLE).unwrap();

        assert!(config.general.scan_ticks);
        assert_eq!(config.token_list().len(), 1);
        assert_eq!(config.pools.len(), 2);
        assert!(matches!(config.pools[0].source().unwrap(), PoolSource::Direct(spec) if spec.kind == PoolKind::ConstantProduct));
        assert!(matches!(
            config.pools[1].source().unwrap(),
            PoolSource::Factory { fee: Some(500), kind: PoolKind::ConcentratedLiquidity, .. }
        ));

        let arb = config.arbitrage.unwrap();
        assert_eq!(arb.mode, LoanMode::Wallet);
        assert!(arb.holders.is_empty());
    }

    #[test]
    fn test_plan_amount_uses_loan_decimals() {
        let arb = ArbConfig::from_toml(SAMPLE).unwrap().arbitrage.unwrap();
        let plan = arb.to_plan(18).unwrap();

        assert_eq!(plan.loan_asset, WETH);
        assert_eq!(plan.amount, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(plan.legs.len(), 2);
        assert_eq!(plan.legs[0].fee, Some(500));
    }

    #[test]
    fn test_plan_rejects_open_loop() {
        let mut arb = ArbConfig::from_toml(SAMPLE).unwrap().arbitrage.unwrap();
        arb.legs.pop();
        assert!(arb.to_plan(18).is_err());
    }

    #[test]
    fn test_pool_entry_needs_location() {
        let toml = r#"
[[pools]]
kind = "constant_product"
token_a = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
"#;
        assert!(ArbConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_factory_lookup_for_concentrated_needs_fee() {
        let toml = r#"
[[pools]]
kind = "concentrated_liquidity"
factory = "0x1F98431c8aD98523631AE4a59f267346ea31F984"
token_a = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
token_b = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
"#;
        assert!(ArbConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_env_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([("RPC_URL", "http://localhost:8545")]);
        let config = BotConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.chain_id, 1);
        assert_eq!(config.multicall, MULTICALL3_ADDRESS);
        assert_eq!(config.tick_batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(120));
        assert!(config.private_key.is_none());
    }

    #[test]
    fn test_env_requires_rpc_url() {
        assert!(BotConfig::from_lookup(|_| None).is_err());

        let env: HashMap<&str, &str> = HashMap::from([("RPC_URL", "http://x"), ("CHAIN_ID", "mainnet")]);
        assert!(BotConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).is_err());
    }
}
