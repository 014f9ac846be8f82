//! Arbitrage Orchestrator
//!
//! Runs one borrow → swap → repay attempt and classifies the outcome:
//!
//! ```text
//! Idle → BalanceCapturedBefore → LoanRequested → LegsExecuting(1..N)
//!      → LoanRepaid → BalanceCapturedAfter → Settled
//! ```
//!
//! Any failure ends the attempt with an [`AttemptFailure`] carrying the last
//! stage reached and the cause. There is no retry: a new attempt must start
//! from fresh pool reads.
//!
//! Net result is valued in the loan asset. Other assets count through the
//! supplied rates; assets with a non-zero change and no rate are reported
//! as unpriced residuals.
//!
//! Created: 2026-10-15

use super::balances::{diff, BalanceAccountant, BalanceDelta, BalanceSnapshot};
use super::loan::{LoanProvider, LoanReceipt, LoanRequest};
use super::plan::ArbitragePlan;
use super::venue::{LegExecutor, LegFailure};
use crate::chain::ChainReader;
use crate::error::ArbError;
use crate::pool::TokenCache;
use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

/// Progress of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Idle,
    BalanceCapturedBefore,
    LoanRequested,
    LegsExecuting { completed: usize },
    LoanRepaid,
    BalanceCapturedAfter,
    Settled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "Idle"),
            Stage::BalanceCapturedBefore => write!(f, "BalanceCaptured(before)"),
            Stage::LoanRequested => write!(f, "LoanRequested"),
            Stage::LegsExecuting { completed } => write!(f, "LegsExecuting({})", completed),
            Stage::LoanRepaid => write!(f, "LoanRepaid"),
            Stage::BalanceCapturedAfter => write!(f, "BalanceCaptured(after)"),
            Stage::Settled => write!(f, "Settled"),
        }
    }
}

/// Terminal failure of an attempt
#[derive(Debug, Error)]
#[error("arbitrage attempt failed after {last_stage}: {cause}")]
pub struct AttemptFailure {
    pub last_stage: Stage,
    #[source]
    pub cause: ArbError,
}

impl AttemptFailure {
    pub(crate) fn at(last_stage: Stage) -> impl FnOnce(ArbError) -> AttemptFailure {
        move |cause| {
            error!("❌ Attempt failed after {}: {}", last_stage, cause);
            AttemptFailure { last_stage, cause }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Profit,
    Loss,
    Breakeven,
}

impl Verdict {
    pub fn classify(net: Decimal) -> Self {
        if net.is_sign_positive() && !net.is_zero() {
            Verdict::Profit
        } else if net.is_zero() {
            Verdict::Breakeven
        } else {
            Verdict::Loss
        }
    }
}

/// Change of an asset that could not be valued in the loan asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residual {
    pub asset: Address,
    pub symbol: String,
    pub delta: Decimal,
}

/// Settled attempt
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageResult {
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
    pub delta: BalanceDelta,
    /// Net change in loan asset units, summed over all holders
    pub net: Decimal,
    pub verdict: Verdict,
    pub residuals: Vec<Residual>,
    pub loan: LoanReceipt,
}

/// Value `delta` in loan asset units.
///
/// The loan asset counts at rate 1, other assets at `rates[asset]` (loan
/// asset per unit). Unpriced non-zero changes are returned as residuals.
pub fn value_delta(
    delta: &BalanceDelta,
    loan_asset: Address,
    rates: &HashMap<Address, Decimal>,
) -> Result<(Decimal, Vec<Residual>), ArbError> {
    let mut net = Decimal::ZERO;
    let mut residuals = Vec::new();

    for (asset, symbol, total) in delta.by_asset() {
        let rate = if asset == loan_asset {
            Decimal::ONE
        } else if let Some(rate) = rates.get(&asset) {
            *rate
        } else {
            if !total.is_zero() {
                residuals.push(Residual { asset, symbol, delta: total });
            }
            continue;
        };

        let valued = total
            .checked_mul(rate)
            .and_then(|v| net.checked_add(v))
            .ok_or_else(|| ArbError::settlement(None, format!("valuing the {} change overflowed", symbol)))?;
        net = valued;
    }

    Ok((net, residuals))
}

/// Diff two snapshots of the same set and value the change.
pub(crate) fn appraise(
    before: &BalanceSnapshot,
    after: &BalanceSnapshot,
    loan_asset: Address,
    rates: &HashMap<Address, Decimal>,
) -> Result<(BalanceDelta, Decimal, Vec<Residual>), ArbError> {
    let delta = diff(before, after)?;
    let (net, residuals) = value_delta(&delta, loan_asset, rates)?;
    for residual in &residuals {
        warn!("Unpriced residual: {} {} ({:?})", residual.delta, residual.symbol, residual.asset);
    }
    Ok((delta, net, residuals))
}

/// Record `rate` (loan asset per unit of `asset`) if it is representable.
pub(crate) fn insert_rate(rates: &mut HashMap<Address, Decimal>, asset: Address, rate: f64) {
    match Decimal::try_from(rate) {
        Ok(rate) => {
            rates.insert(asset, rate);
        }
        Err(e) => warn!("Ignoring rate {} for {:?}: {}", rate, asset, e),
    }
}

/// Sequences a single arbitrage attempt
pub struct ArbitrageOrchestrator<C: ?Sized, L, X> {
    tokens: TokenCache<C>,
    accountant: BalanceAccountant<C>,
    loan: L,
    legs: X,
    holders: Vec<Address>,
    receiver: Address,
    rates: HashMap<Address, Decimal>,
}

impl<C, L, X> ArbitrageOrchestrator<C, L, X>
where
    C: ChainReader + ?Sized,
    L: LoanProvider,
    X: LegExecutor,
{
    /// `holders` are the addresses whose balances are tracked (wallet,
    /// receiver contract). `receiver` gets the loan callback.
    pub fn new(tokens: TokenCache<C>, loan: L, legs: X, holders: Vec<Address>, receiver: Address) -> Self {
        let accountant = BalanceAccountant::new(std::sync::Arc::clone(tokens.source()));
        Self {
            tokens,
            accountant,
            loan,
            legs,
            holders,
            receiver,
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

    /// Run `plan` once.
    pub async fn run(&self, plan: &ArbitragePlan) -> Result<ArbitrageResult, AttemptFailure> {
        let mut stage = Stage::Idle;
        info!("🚀 Arbitrage attempt: {} (amount {})", plan.route(), plan.amount);

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

        let request = LoanRequest::for_plan(plan, self.receiver);
        stage = Stage::LoanRequested;
        info!("{}: {} of {:?} to {:?}", stage, request.amount, request.asset, request.receiver);

        let loan = match self.loan.flash_loan(&request, &self.legs).await {
            Ok(receipt) => receipt,
            Err(LegFailure { completed, cause }) => {
                let last_stage = match completed {
                    0 => Stage::LoanRequested,
                    completed => Stage::LegsExecuting { completed },
                };
                return Err(AttemptFailure::at(last_stage)(cause));
            }
        };

        stage = Stage::LegsExecuting {
            completed: loan.legs_executed,
        };
        info!("{} of {}", stage, plan.legs.len());

        stage = Stage::LoanRepaid;
        info!(
            "💸 {} (tx {:?}, returned {:?}, fee {:?})",
            stage, loan.tx_hash, loan.amount_returned, loan.fee
        );

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

        stage = Stage::Settled;
        let symbol = assets.first().map(|t| t.symbol.as_str()).unwrap_or("?");
        match verdict {
            Verdict::Profit => info!("✅ {}: PROFIT {} {}", stage, net, symbol),
            Verdict::Loss => warn!("📉 {}: LOSS {} {}", stage, net, symbol),
            Verdict::Breakeven => info!("{}: BREAKEVEN", stage),
        }

        Ok(ArbitrageResult {
            before,
            after,
            delta,
            net,
            verdict,
            residuals,
            loan,
        })
    }
}
