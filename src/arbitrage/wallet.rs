//! Wallet-Funded Runs
//!
//! Swaps a plan's legs with the wallet's own balance of the loan asset.
//! Nothing is borrowed, and each router swap confirms on its own, so the
//! legs do not settle or revert as one unit. A chain that stops part way
//! leaves real balance changes behind; the after snapshot is therefore
//! taken on every run that got past the before snapshot, and the realized
//! change is reported together with the failure.
//!
//! Created: 2026-10-15

use super::balances::{BalanceAccountant, BalanceDelta, BalanceSnapshot};
use super::orchestrator::{appraise, insert_rate, AttemptFailure, Residual, Stage, Verdict};
use super::plan::ArbitragePlan;
use super::venue::{LegExecutor, LegFailure};
use crate::chain::ChainReader;
use crate::pool::TokenCache;
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Realized outcome of a wallet-funded run, complete or not
#[derive(Debug, Serialize)]
pub struct WalletRunResult {
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
    pub delta: BalanceDelta,
    /// Net change in loan asset units, summed over all holders
    pub net: Decimal,
    pub verdict: Verdict,
    pub residuals: Vec<Residual>,
    pub legs_executed: usize,
    /// Loan asset produced by the final leg, when every leg completed
    pub amount_returned: Option<U256>,
    /// Why the legs stopped early; the balances above are still realized
    #[serde(serialize_with = "failure_message")]
    pub failure: Option<AttemptFailure>,
}

impl WalletRunResult {
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }
}

fn failure_message<S: Serializer>(failure: &Option<AttemptFailure>, serializer: S) -> Result<S::Ok, S::Error> {
    match failure {
        Some(failure) => serializer.serialize_some(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Runs a plan's legs from a funded wallet and reports what changed
pub struct WalletArbitrage<C: ?Sized, X> {
    tokens: TokenCache<C>,
    accountant: BalanceAccountant<C>,
    legs: X,
    holders: Vec<Address>,
    rates: HashMap<Address, Decimal>,
}

impl<C, X> WalletArbitrage<C, X>
where
    C: ChainReader + ?Sized,
    X: LegExecutor,
{
    /// `holders` must include the wallet that pays the first leg.
    pub fn new(tokens: TokenCache<C>, legs: X, holders: Vec<Address>) -> Self {
        let accountant = BalanceAccountant::new(Arc::clone(tokens.source()));
        Self {
            tokens,
            accountant,
            legs,
            holders,
            rates: HashMap::new(),
        }
    }

    /// Value of one unit of `asset` in loan asset units.
    pub fn with_rate(mut self, asset: Address, rate: f64) -> Self {
        insert_rate(&mut self.rates, asset, rate);
        self
    }

    pub fn legs(&self) -> &X {
        &self.legs
    }

    /// Run `plan` once. `Err` only when nothing could have been spent, or
    /// when the after snapshot itself could not be read.
    pub async fn run(&self, plan: &ArbitragePlan) -> Result<WalletRunResult, AttemptFailure> {
        let mut stage = Stage::Idle;
        info!("🚀 Wallet-funded run: {} (amount {})", plan.route(), plan.amount);

        plan.validate().map_err(|e| AttemptFailure::at(stage)(e.into()))?;

        let assets = self
            .tokens
            .get_many(&plan.assets())
            .await
            .map_err(AttemptFailure::at(stage))?;

        let before = self
            .accountant
            .capture(&assets, &self.holders)
            .await
            .map_err(AttemptFailure::at(stage))?;
        stage = Stage::BalanceCapturedBefore;
        info!("📸 {} ({} entries)", stage, before.entries.len());

        let (legs_executed, amount_returned, failure) = match self.legs.execute_legs(plan).await {
            Ok(amount) => {
                stage = Stage::LegsExecuting {
                    completed: plan.legs.len(),
                };
                info!("{}: {} {:?} back", stage, amount, plan.loan_asset);
                (plan.legs.len(), Some(amount), None)
            }
            Err(LegFailure { completed, cause }) => {
                stage = match completed {
                    0 => Stage::BalanceCapturedBefore,
                    completed => Stage::LegsExecuting { completed },
                };
                error!("❌ Legs stopped after {}: {}", stage, cause);
                (
                    completed,
                    None,
                    Some(AttemptFailure {
                        last_stage: stage,
                        cause,
                    }),
                )
            }
        };

        let after = self
            .accountant
            .capture(&assets, &self.holders)
            .await
            .map_err(AttemptFailure::at(stage))?;
        stage = Stage::BalanceCapturedAfter;
        info!("📸 {} ({} entries)", stage, after.entries.len());

        let (delta, net, residuals) =
            appraise(&before, &after, plan.loan_asset, &self.rates).map_err(AttemptFailure::at(stage))?;
        let verdict = Verdict::classify(net);

        let symbol = assets.first().map(|t| t.symbol.as_str()).unwrap_or("?");
        match (&failure, verdict) {
            (Some(_), _) => warn!("⚠️ Incomplete run realized {} {} ({:?})", net, symbol, verdict),
            (None, Verdict::Profit) => info!("✅ {}: PROFIT {} {}", Stage::Settled, net, symbol),
            (None, Verdict::Loss) => warn!("📉 {}: LOSS {} {}", Stage::Settled, net, symbol),
            (None, Verdict::Breakeven) => info!("{}: BREAKEVEN", Stage::Settled),
        }

        Ok(WalletRunResult {
            before,
            after,
            delta,
            net,
            verdict,
            residuals,
            legs_executed,
            amount_returned,
            failure,
        })
    }
}
