//! Loan Providers
//!
//! A flash loan is requested with the whole plan as one opaque payload. The
//! provider runs the legs inside the same settlement unit and either gets
//! principal plus fee back or reverts everything.
//!
//! - [`FlashLoanContract`]: sends the payload to the deployed receiver
//!   contract, which borrows, swaps and repays on-chain.
//!   A reverted request is a settlement failure: the receiver rejected
//!   repayment or one of its legs failed, and the whole unit rolled back.
//!
//! Wallet-funded runs borrow nothing and go through
//! [`WalletArbitrage`](super::wallet::WalletArbitrage) instead.
//!
//! Created: 2026-10-15

use super::plan::ArbitragePlan;
use super::venue::{LegExecutor, LegFailure};
use crate::chain::wait_for_receipt;
use crate::error::ArbError;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// What the loan provider receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRequest {
    pub asset: Address,
    pub amount: U256,
    /// ABI-encoded `requestFlashLoanArbitrage(params)`
    pub payload: Bytes,
    /// Contract that receives the loan callback
    pub receiver: Address,
    pub leg_count: usize,
}

impl LoanRequest {
    pub fn for_plan(plan: &ArbitragePlan, receiver: Address) -> Self {
        Self {
            asset: plan.loan_asset,
            amount: plan.amount,
            payload: plan.encode_payload(),
            receiver,
            leg_count: plan.legs.len(),
        }
    }
}

/// Outcome of a repaid loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanReceipt {
    pub tx_hash: Option<TxHash>,
    /// Loan asset produced by the final leg, when observable off-chain
    pub amount_returned: Option<U256>,
    /// Fee charged on top of the principal, when known
    pub fee: Option<U256>,
    pub legs_executed: usize,
}

#[async_trait]
pub trait LoanProvider: Send + Sync {
    /// Borrow, run `legs`, repay. Returns only once the loan is repaid;
    /// any failure means nothing was settled. The failure carries the legs
    /// that had completed before the unit was rolled back, when known.
    async fn flash_loan(&self, request: &LoanRequest, legs: &dyn LegExecutor) -> Result<LoanReceipt, LegFailure>;
}

/// Deployed flash-loan receiver contract
pub struct FlashLoanContract<P> {
    provider: Arc<P>,
    confirmation_timeout: Duration,
}

impl<P: Provider + 'static> FlashLoanContract<P> {
    /// `provider` must carry the signing wallet.
    pub fn new(provider: Arc<P>, confirmation_timeout: Duration) -> Self {
        Self {
            provider,
            confirmation_timeout,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> LoanProvider for FlashLoanContract<P> {
    /// Legs run inside the receiver contract, so `_legs` is not called.
    async fn flash_loan(&self, request: &LoanRequest, _legs: &dyn LegExecutor) -> Result<LoanReceipt, LegFailure> {
        info!(
            "⚡ Requesting flash loan of {} {:?} through {:?} ({} legs)",
            request.amount, request.asset, request.receiver, request.leg_count
        );

        let tx = TransactionRequest::default()
            .with_to(request.receiver)
            .with_input(request.payload.clone());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(ArbError::external("flash loan request send failed"))?;

        let receipt = wait_for_receipt(pending, self.confirmation_timeout, "Flash loan").await?;

        Ok(loan_receipt(receipt.status(), receipt.transaction_hash, request.leg_count)?)
    }
}

/// Outcome of a mined flash-loan transaction. A revert means the receiver
/// rejected repayment or a leg failed, and nothing was settled.
pub fn loan_receipt(succeeded: bool, tx_hash: TxHash, leg_count: usize) -> Result<LoanReceipt, ArbError> {
    if !succeeded {
        return Err(ArbError::settlement(
            None,
            format!("flash loan {:?} reverted: repayment rejected or a leg failed", tx_hash),
        ));
    }

    Ok(LoanReceipt {
        tx_hash: Some(tx_hash),
        amount_returned: None,
        fee: None,
        legs_executed: leg_count,
    })
}

/// In-process lender charging a fee in basis points of the principal.
/// Legs run against in-memory balances that are not rolled back on
/// rejection, so it only stands in for a real provider in tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalLender {
    fee_bps: u32,
}

#[cfg(test)]
impl LocalLender {
    pub fn new(fee_bps: u32) -> Self {
        Self { fee_bps }
    }

    pub fn fee_for(&self, amount: U256) -> U256 {
        amount * U256::from(self.fee_bps) / U256::from(10_000u32)
    }
}

#[cfg(test)]
#[async_trait]
impl LoanProvider for LocalLender {
    async fn flash_loan(&self, request: &LoanRequest, legs: &dyn LegExecutor) -> Result<LoanReceipt, LegFailure> {
        let plan = ArbitragePlan::decode_payload(&request.payload)?;
        if plan.loan_asset != request.asset || plan.amount != request.amount {
            return Err(ArbError::settlement(None, "payload does not match the requested loan").into());
        }

        let fee = self.fee_for(request.amount);
        let owed = request.amount + fee;
        let returned = legs.execute_legs(&plan).await?;

        if returned < owed {
            return Err(LegFailure {
                completed: plan.legs.len(),
                cause: ArbError::settlement(
                    None,
                    format!("repayment {} is below principal plus fee {}", returned, owed),
                ),
            });
        }

        Ok(LoanReceipt {
            tx_hash: None,
            amount_returned: Some(returned),
            fee: Some(fee),
            legs_executed: plan.legs.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::mock::MockVenue;
    use crate::arbitrage::plan::{SwapLeg, Venue, VenueKind};
    use crate::arbitrage::venue::LegRunner;
    use crate::chain::mock::MockChain;

    const WETH: Address = Address::repeat_byte(0x01);
    const USDC: Address = Address::repeat_byte(0x02);
    const WALLET: Address = Address::repeat_byte(0x77);
    const RECEIVER: Address = Address::repeat_byte(0x88);

    fn round_trip() -> ArbitragePlan {
        let venue = Venue {
            kind: VenueKind::ConstantProductRouter,
            router: Address::repeat_byte(0x20),
        };
        ArbitragePlan {
            loan_asset: WETH,
            amount: U256::from(10_000u64),
            legs: vec![
                SwapLeg {
                    token_in: WETH,
                    token_out: USDC,
                    venue,
                    fee: None,
                },
                SwapLeg {
                    token_in: USDC,
                    token_out: WETH,
                    venue,
                    fee: None,
                },
            ],
        }
    }

    #[test]
    fn test_request_carries_plan() {
        let plan = round_trip();
        let request = LoanRequest::for_plan(&plan, RECEIVER);
        assert_eq!(request.asset, WETH);
        assert_eq!(request.leg_count, 2);
        assert_eq!(ArbitragePlan::decode_payload(&request.payload).unwrap(), plan);
    }

    #[test]
    fn test_fee_bps() {
        assert_eq!(LocalLender::new(9).fee_for(U256::from(10_000u64)), U256::from(9u64));
        assert_eq!(LocalLender::new(0).fee_for(U256::from(10_000u64)), U256::ZERO);
    }

    #[tokio::test]
    async fn test_local_lender_accepts_full_repayment() {
        let venue = MockVenue::new(Arc::new(MockChain::new()), WALLET).with_rate(USDC, WETH, 1001, 1000);
        let runner = LegRunner::new(venue);

        let receipt = LocalLender::new(9)
            .flash_loan(&LoanRequest::for_plan(&round_trip(), RECEIVER), &runner)
            .await
            .unwrap();

        assert_eq!(receipt.amount_returned, Some(U256::from(10_010u64)));
        assert_eq!(receipt.fee, Some(U256::from(9u64)));
        assert_eq!(receipt.legs_executed, 2);
    }

    #[tokio::test]
    async fn test_local_lender_rejects_short_repayment() {
        let runner = LegRunner::new(MockVenue::new(Arc::new(MockChain::new()), WALLET));

        let err = LocalLender::new(9)
            .flash_loan(&LoanRequest::for_plan(&round_trip(), RECEIVER), &runner)
            .await
            .unwrap_err();

        assert!(matches!(err.cause, ArbError::Settlement { leg: None, ref reason } if reason.contains("below")));
        assert_eq!(err.completed, 2);
    }

    #[tokio::test]
    async fn test_local_lender_rejects_tampered_payload() {
        let runner = LegRunner::new(MockVenue::new(Arc::new(MockChain::new()), WALLET));
        let mut request = LoanRequest::for_plan(&round_trip(), RECEIVER);
        request.amount = U256::from(1u64);

        let err = LocalLender::new(0).flash_loan(&request, &runner).await.unwrap_err();
        assert!(matches!(err.cause, ArbError::Settlement { .. }));
        assert_eq!(err.completed, 0);
        assert!(runner.venue().calls().is_empty());
    }

    #[test]
    fn test_reverted_flash_loan_is_settlement_failure() {
        let tx_hash = TxHash::repeat_byte(0xfe);

        let err = loan_receipt(false, tx_hash, 3).unwrap_err();

        assert!(matches!(err, ArbError::Settlement { leg: None, ref reason } if reason.contains("reverted")));
        assert!(!matches!(err, ArbError::ExternalCall { .. }));
    }

    #[test]
    fn test_mined_flash_loan_reports_every_leg() {
        let tx_hash = TxHash::repeat_byte(0xfe);

        let receipt = loan_receipt(true, tx_hash, 3).unwrap();

        assert_eq!(receipt.tx_hash, Some(tx_hash));
        assert_eq!(receipt.legs_executed, 3);
        assert_eq!(receipt.amount_returned, None);
    }
}
