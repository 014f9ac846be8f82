//! RPC Chain Reader
//!
//! [`ChainReader`] over any alloy `Provider`. Independent reads of the same
//! pool are issued concurrently via `tokio::try_join!`; tick bitmap words
//! and balance snapshots are packed into a single Multicall3 `aggregate3`
//! eth_call per request.
//!
//! Created: 2026-10-15

use super::ChainReader;
use crate::contracts::{
    fee_to_u24, IERC20Metadata, IMulticall3, IUniswapV2Factory, IUniswapV2Pair, UniswapV3Factory,
    UniswapV3Pool,
};
use crate::error::ArbError;
use crate::types::{ConcentratedState, TokenMetadata};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Chain reader backed by a JSON-RPC provider
pub struct RpcChainReader<P> {
    provider: Arc<P>,
    multicall: Address,
}

impl<P: Provider + 'static> RpcChainReader<P> {
    pub fn new(provider: Arc<P>, multicall: Address) -> Self {
        Self { provider, multicall }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider + 'static> ChainReader for RpcChainReader<P> {
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ArbError> {
        let erc20 = IERC20Metadata::new(token, Arc::clone(&self.provider));

        let decimals_call = erc20.decimals();
        let symbol_call = erc20.symbol();
        let name_call = erc20.name();
        let (decimals, symbol, name) =
            tokio::join!(decimals_call.call(), symbol_call.call(), name_call.call());

        let decimals = decimals.map_err(ArbError::external(format!("decimals() of {}", token)))?;

        // symbol()/name() are optional in ERC-20 and some tokens return bytes32
        Ok(TokenMetadata {
            decimals,
            symbol: symbol.ok(),
            name: name.ok(),
        })
    }

    async fn balances_of(&self, pairs: &[(Address, Address)]) -> Result<Vec<U256>, ArbError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }

        // One aggregate3 eth_call, so every balance comes from the same block
        let calls: Vec<IMulticall3::Call3> = pairs
            .iter()
            .map(|&(token, holder)| IMulticall3::Call3 {
                target: token,
                allowFailure: false,
                callData: IERC20Metadata::balanceOfCall { account: holder }.abi_encode().into(),
            })
            .collect();

        debug!("Multicall batch: {} balanceOf reads", pairs.len());

        let results = IMulticall3::new(self.multicall, Arc::clone(&self.provider))
            .aggregate3(calls)
            .call()
            .await
            .map_err(ArbError::external(format!("aggregate3 balanceOf batch of {} reads", pairs.len())))?;

        decode_balance_results(&results, pairs)
    }

    async fn pool_tokens(&self, pool: Address) -> Result<(Address, Address), ArbError> {
        // token0()/token1() share selectors across both pool kinds
        let pair = IUniswapV2Pair::new(pool, Arc::clone(&self.provider));
        let token0_call = pair.token0();
        let token1_call = pair.token1();
        tokio::try_join!(token0_call.call(), token1_call.call())
            .map_err(ArbError::external(format!("token0()/token1() of {}", pool)))
    }

    async fn pool_fee(&self, pool: Address) -> Result<u32, ArbError> {
        let fee = UniswapV3Pool::new(pool, Arc::clone(&self.provider))
            .fee()
            .call()
            .await
            .map_err(ArbError::external(format!("fee() of {}", pool)))?;
        Ok(fee.to::<u32>())
    }

    async fn reserves(&self, pool: Address) -> Result<(U256, U256), ArbError> {
        let reserves = IUniswapV2Pair::new(pool, Arc::clone(&self.provider))
            .getReserves()
            .call()
            .await
            .map_err(ArbError::external(format!("getReserves() of {}", pool)))?;

        Ok((U256::from(reserves.reserve0), U256::from(reserves.reserve1)))
    }

    async fn concentrated_state(&self, pool: Address) -> Result<ConcentratedState, ArbError> {
        let contract = UniswapV3Pool::new(pool, Arc::clone(&self.provider));
        let slot0_call = contract.slot0();
        let liq_call = contract.liquidity();
        let spacing_call = contract.tickSpacing();

        let (slot0, liquidity, spacing) =
            tokio::try_join!(slot0_call.call(), liq_call.call(), spacing_call.call())
                .map_err(ArbError::external(format!("slot0()/liquidity()/tickSpacing() of {}", pool)))?;

        let tick = i32::try_from(slot0.tick).map_err(ArbError::external("slot0 tick out of range"))?;
        let tick_spacing =
            i32::try_from(spacing).map_err(ArbError::external("tick spacing out of range"))?;

        Ok(ConcentratedState {
            sqrt_price_x96: U256::from(slot0.sqrtPriceX96),
            liquidity,
            tick,
            tick_spacing,
        })
    }

    async fn tick_bitmap_words(&self, pool: Address, words: &[i16]) -> Result<Vec<U256>, ArbError> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let calls: Vec<IMulticall3::Call3> = words
            .iter()
            .map(|&word| IMulticall3::Call3 {
                target: pool,
                allowFailure: false,
                callData: UniswapV3Pool::tickBitmapCall { wordPosition: word }
                    .abi_encode()
                    .into(),
            })
            .collect();

        debug!(
            "Multicall batch: {} tickBitmap words of {:?} ({}..={})",
            words.len(),
            pool,
            words[0],
            words[words.len() - 1]
        );

        let results = IMulticall3::new(self.multicall, Arc::clone(&self.provider))
            .aggregate3(calls)
            .call()
            .await
            .map_err(ArbError::external(format!("aggregate3 tickBitmap batch on {}", pool)))?;

        decode_bitmap_results(&results, words, pool)
    }

    async fn find_concentrated_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Option<Address>, ArbError> {
        let pool = UniswapV3Factory::new(factory, Arc::clone(&self.provider))
            .getPool(token_a, token_b, fee_to_u24(fee))
            .call()
            .await
            .map_err(ArbError::external("Failed to get V3 pool address"))?;

        Ok((pool != Address::ZERO).then_some(pool))
    }

    async fn find_constant_product_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, ArbError> {
        let pair = IUniswapV2Factory::new(factory, Arc::clone(&self.provider))
            .getPair(token_a, token_b)
            .call()
            .await
            .map_err(ArbError::external("Failed to get V2 pair address"))?;

        Ok((pair != Address::ZERO).then_some(pair))
    }
}

/// Bitmap of each word from an `aggregate3` batch of `tickBitmap` calls.
pub fn decode_bitmap_results(
    results: &[IMulticall3::CallResult],
    words: &[i16],
    pool: Address,
) -> Result<Vec<U256>, ArbError> {
    decode_words(results, words.len(), |i| format!("tickBitmap({}) of {}", words[i], pool))
}

/// Raw balance of each pair from an `aggregate3` batch of `balanceOf` calls.
pub fn decode_balance_results(
    results: &[IMulticall3::CallResult],
    pairs: &[(Address, Address)],
) -> Result<Vec<U256>, ArbError> {
    decode_words(results, pairs.len(), |i| format!("balanceOf({}) on {}", pairs[i].1, pairs[i].0))
}

/// First 32-byte word of every result, in call order.
fn decode_words(
    results: &[IMulticall3::CallResult],
    expected: usize,
    label: impl Fn(usize) -> String,
) -> Result<Vec<U256>, ArbError> {
    if results.len() != expected {
        return Err(ArbError::ExternalCall {
            context: format!("Multicall3 returned {} results, expected {}", results.len(), expected),
            source: "result count mismatch".into(),
        });
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            if !result.success || result.returnData.len() < 32 {
                return Err(ArbError::ExternalCall {
                    context: label(i),
                    source: format!("call failed with {} bytes of return data", result.returnData.len()).into(),
                });
            }
            Ok(U256::from_be_slice(&result.returnData[..32]))
        })
        .collect()
}
