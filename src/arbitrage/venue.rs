//! Swap Venues and Leg Execution
//!
//! A [`SwapVenue`] turns `(leg, amountIn)` into `amountOut`. The
//! [`LegRunner`] walks a plan's legs strictly in order, feeding each leg the
//! previous leg's output, and fails settlement on a zero output or a chain
//! that does not end in the loan asset. A failure reports how many legs
//! had completed before it.
//!
//! [`RouterVenue`] swaps through Uniswap V2/V3 style routers from a wallet:
//! allowance check, swap, then the realized output is the recipient's
//! balance change of `tokenOut`. A reverted swap fails settlement at its leg.
//!
//! Created: 2026-10-15

use super::plan::{ArbitragePlan, SwapLeg, VenueKind};
use crate::chain::{confirm, wait_for_receipt};
use crate::contracts::{fee_to_u24, IERC20Metadata, ISwapRouter, IUniswapV2Router02};
use crate::error::ArbError;
use alloy::primitives::aliases::U160;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Executes one swap and reports the amount received
#[async_trait]
pub trait SwapVenue: Send + Sync {
    async fn swap(&self, leg: &SwapLeg, amount_in: U256) -> Result<U256, ArbError>;
}

/// A leg chain that stopped early, with the number of legs that had
/// completed before `cause`
#[derive(Debug, Error)]
#[error("{cause} ({completed} legs completed)")]
pub struct LegFailure {
    pub completed: usize,
    #[source]
    pub cause: ArbError,
}

impl From<ArbError> for LegFailure {
    fn from(cause: ArbError) -> Self {
        LegFailure { completed: 0, cause }
    }
}

/// Runs every leg of a plan, returning the final amount of the loan asset
#[async_trait]
pub trait LegExecutor: Send + Sync {
    async fn execute_legs(&self, plan: &ArbitragePlan) -> Result<U256, LegFailure>;
}

/// Sequential leg runner over a single venue
pub struct LegRunner<V> {
    venue: V,
}

impl<V: SwapVenue> LegRunner<V> {
    pub fn new(venue: V) -> Self {
        Self { venue }
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }
}

#[async_trait]
impl<V: SwapVenue> LegExecutor for LegRunner<V> {
    async fn execute_legs(&self, plan: &ArbitragePlan) -> Result<U256, LegFailure> {
        let mut token = plan.loan_asset;
        let mut amount = plan.amount;
        let total = plan.legs.len();

        for (i, leg) in plan.legs.iter().enumerate() {
            let fail = |cause: ArbError| LegFailure {
                completed: i,
                cause: cause.at_leg(i),
            };

            if leg.token_in != token {
                return Err(fail(ArbError::settlement(
                    Some(i),
                    format!("leg {} spends {:?} but the previous leg produced {:?}", i + 1, leg.token_in, token),
                )));
            }

            info!(
                "🔁 Leg {}/{}: {} {:?} -> {:?} via {} router {:?}",
                i + 1,
                total,
                amount,
                leg.token_in,
                leg.token_out,
                leg.venue.kind,
                leg.venue.router
            );

            let amount_out = self.venue.swap(leg, amount).await.map_err(fail)?;
            if amount_out.is_zero() {
                return Err(fail(ArbError::settlement(
                    Some(i),
                    format!("leg {} returned zero output", i + 1),
                )));
            }

            debug!("Leg {}/{} out: {} {:?}", i + 1, total, amount_out, leg.token_out);
            token = leg.token_out;
            amount = amount_out;
        }

        if token != plan.loan_asset {
            return Err(LegFailure {
                completed: total,
                cause: ArbError::settlement(
                    None,
                    format!("final leg ends in {:?}, not the loan asset {:?}", token, plan.loan_asset),
                ),
            });
        }

        Ok(amount)
    }
}

/// Legs that run inside the flash-loan receiver contract, out of reach of
/// this process. Paired with [`FlashLoanContract`](super::loan::FlashLoanContract).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractLegs;

#[async_trait]
impl LegExecutor for ContractLegs {
    async fn execute_legs(&self, _plan: &ArbitragePlan) -> Result<U256, LegFailure> {
        Err(ArbError::settlement(None, "legs of this plan are executed by the receiver contract").into())
    }
}

/// Router swaps sent from a signing wallet.
///
/// No minimum output is enforced; the fee tier is the only slippage model.
pub struct RouterVenue<P> {
    provider: Arc<P>,
    owner: Address,
    deadline_secs: u64,
    confirmation_timeout: Duration,
}

impl<P: Provider + 'static> RouterVenue<P> {
    /// `provider` must sign for `owner`, which pays `tokenIn` and receives `tokenOut`.
    pub fn new(provider: Arc<P>, owner: Address, confirmation_timeout: Duration) -> Self {
        Self {
            provider,
            owner,
            deadline_secs: 300,
            confirmation_timeout,
        }
    }

    pub fn with_deadline(mut self, deadline_secs: u64) -> Self {
        self.deadline_secs = deadline_secs;
        self
    }

    async fn balance(&self, token: Address) -> Result<U256, ArbError> {
        IERC20Metadata::new(token, Arc::clone(&self.provider))
            .balanceOf(self.owner)
            .call()
            .await
            .map_err(ArbError::external(format!("balanceOf({}) on {}", self.owner, token)))
    }

    /// Approve `router` for `U256::MAX` if the current allowance is below `amount`.
    async fn ensure_approval(&self, token: Address, router: Address, amount: U256) -> Result<(), ArbError> {
        let erc20 = IERC20Metadata::new(token, Arc::clone(&self.provider));

        let allowance = erc20
            .allowance(self.owner, router)
            .call()
            .await
            .map_err(ArbError::external(format!("allowance() of {}", token)))?;

        if allowance >= amount {
            debug!("Sufficient allowance: {} >= {}", allowance, amount);
            return Ok(());
        }

        info!("Approving {} for router {:?}", token, router);
        let pending = erc20
            .approve(router, U256::MAX)
            .send()
            .await
            .map_err(ArbError::external(format!("approve() on {}", token)))?;
        confirm(pending, self.confirmation_timeout, "Approval").await?;
        Ok(())
    }

    fn deadline(&self) -> U256 {
        U256::from(chrono::Utc::now().timestamp().max(0) as u64 + self.deadline_secs)
    }
}

#[async_trait]
impl<P: Provider + 'static> SwapVenue for RouterVenue<P> {
    async fn swap(&self, leg: &SwapLeg, amount_in: U256) -> Result<U256, ArbError> {
        let router = leg.venue.router;
        self.ensure_approval(leg.token_in, router, amount_in).await?;

        let before = self.balance(leg.token_out).await?;

        let pending = match leg.venue.kind {
            VenueKind::ConstantProductRouter => {
                debug!("V2 Swap: {} {} -> {} on {:?}", amount_in, leg.token_in, leg.token_out, router);
                IUniswapV2Router02::new(router, Arc::clone(&self.provider))
                    .swapExactTokensForTokens(
                        amount_in,
                        U256::ZERO,
                        vec![leg.token_in, leg.token_out],
                        self.owner,
                        self.deadline(),
                    )
                    .send()
                    .await
                    .map_err(ArbError::external("V2 swap send failed"))?
            }
            VenueKind::ConcentratedLiquidityRouter => {
                let fee = leg
                    .fee
                    .ok_or_else(|| ArbError::settlement(None, "concentrated-liquidity leg without a fee tier"))?;
                debug!(
                    "V3 Swap: {} {} -> {} on {:?} (fee tier: {})",
                    amount_in, leg.token_in, leg.token_out, router, fee
                );
                // sqrtPriceLimitX96 = 0 means no price limit
                let params = ISwapRouter::ExactInputSingleParams {
                    tokenIn: leg.token_in,
                    tokenOut: leg.token_out,
                    fee: fee_to_u24(fee),
                    recipient: self.owner,
                    deadline: self.deadline(),
                    amountIn: amount_in,
                    amountOutMinimum: U256::ZERO,
                    sqrtPriceLimitX96: U160::ZERO,
                };
                ISwapRouter::new(router, Arc::clone(&self.provider))
                    .exactInputSingle(params)
                    .send()
                    .await
                    .map_err(ArbError::external("V3 swap send failed"))?
            }
        };

        let receipt = wait_for_receipt(pending, self.confirmation_timeout, &format!("{} swap", leg.venue.kind)).await?;
        if !receipt.status() {
            return Err(ArbError::settlement(
                None,
                format!("{} swap {:?} reverted", leg.venue.kind, receipt.transaction_hash),
            ));
        }

        let after = self.balance(leg.token_out).await?;
        Ok(after.saturating_sub(before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::mock::MockVenue;
    use crate::arbitrage::plan::Venue;
    use crate::chain::mock::MockChain;

    const WETH: Address = Address::repeat_byte(0x01);
    const USDC: Address = Address::repeat_byte(0x02);
    const DAI: Address = Address::repeat_byte(0x03);
    const WALLET: Address = Address::repeat_byte(0x77);

    fn leg(token_in: Address, token_out: Address) -> SwapLeg {
        SwapLeg {
            token_in,
            token_out,
            venue: Venue {
                kind: VenueKind::ConstantProductRouter,
                router: Address::repeat_byte(0x20),
            },
            fee: None,
        }
    }

    fn plan(legs: Vec<SwapLeg>) -> ArbitragePlan {
        ArbitragePlan {
            loan_asset: WETH,
            amount: U256::from(1_000u64),
            legs,
        }
    }

    #[tokio::test]
    async fn test_output_feeds_next_leg() {
        let chain = Arc::new(MockChain::new());
        let venue = MockVenue::new(Arc::clone(&chain), WALLET)
            .with_rate(WETH, USDC, 2000, 1)
            .with_rate(USDC, DAI, 1, 1)
            .with_rate(DAI, WETH, 11, 20_000);
        let runner = LegRunner::new(venue);

        let out = runner
            .execute_legs(&plan(vec![leg(WETH, USDC), leg(USDC, DAI), leg(DAI, WETH)]))
            .await
            .unwrap();

        // 1000 -> 2_000_000 -> 2_000_000 -> 1100
        assert_eq!(out, U256::from(1_100u64));
        assert_eq!(runner.venue().calls(), vec![U256::from(1_000u64), U256::from(2_000_000u64), U256::from(2_000_000u64)]);
    }

    #[tokio::test]
    async fn test_zero_output_fails_settlement_at_leg() {
        let chain = Arc::new(MockChain::new());
        let venue = MockVenue::new(chain, WALLET).with_rate(USDC, DAI, 0, 1);
        let runner = LegRunner::new(venue);

        let err = runner
            .execute_legs(&plan(vec![leg(WETH, USDC), leg(USDC, DAI), leg(DAI, WETH)]))
            .await
            .unwrap_err();

        assert!(matches!(err.cause, ArbError::Settlement { leg: Some(1), .. }));
        assert_eq!(err.completed, 1);
    }

    #[tokio::test]
    async fn test_chain_not_ending_in_loan_asset_fails() {
        let runner = LegRunner::new(MockVenue::new(Arc::new(MockChain::new()), WALLET));

        let err = runner
            .execute_legs(&plan(vec![leg(WETH, USDC), leg(USDC, DAI)]))
            .await
            .unwrap_err();

        assert!(matches!(err.cause, ArbError::Settlement { leg: None, .. }));
        assert_eq!(err.completed, 2);
    }

    #[tokio::test]
    async fn test_mismatched_input_token_fails_before_swapping() {
        let runner = LegRunner::new(MockVenue::new(Arc::new(MockChain::new()), WALLET));

        let err = runner
            .execute_legs(&plan(vec![leg(WETH, USDC), leg(DAI, WETH)]))
            .await
            .unwrap_err();

        assert_eq!(err.cause.failed_leg(), Some(1));
        assert_eq!(err.completed, 1);
        assert_eq!(runner.venue().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_report_their_own_progress() {
        let chain = Arc::new(MockChain::new());
        let venue = MockVenue::new(chain, WALLET).with_rate(USDC, DAI, 0, 1);
        let runner = LegRunner::new(venue);

        let stops_at_second = plan(vec![leg(WETH, USDC), leg(USDC, DAI), leg(DAI, WETH)]);
        let breaks_at_third = plan(vec![leg(WETH, DAI), leg(DAI, USDC), leg(DAI, WETH)]);
        let (first, second) = tokio::join!(
            runner.execute_legs(&stops_at_second),
            runner.execute_legs(&breaks_at_third)
        );

        assert_eq!(first.unwrap_err().completed, 1);
        assert_eq!(second.unwrap_err().completed, 2);
    }

    #[tokio::test]
    async fn test_venue_failure_is_attributed_to_its_leg() {
        struct Reverting;

        #[async_trait]
        impl SwapVenue for Reverting {
            async fn swap(&self, _leg: &SwapLeg, _amount_in: U256) -> Result<U256, ArbError> {
                Err(ArbError::settlement(None, "swap reverted"))
            }
        }

        let err = LegRunner::new(Reverting)
            .execute_legs(&plan(vec![leg(WETH, USDC), leg(USDC, WETH)]))
            .await
            .unwrap_err();

        assert_eq!(err.completed, 0);
        assert_eq!(err.cause.failed_leg(), Some(0));
    }
}
