//! Arbitrage Module
//!
//! Flash-loan funded swap cycles: plan validation and encoding, swap venues
//! and the sequential leg runner, loan providers, balance accounting and
//! the orchestrator that sequences one attempt. Wallet-funded runs, which
//! borrow nothing, have their own runner.
//!
//! Created: 2026-10-15

pub mod balances;
pub mod loan;
pub mod orchestrator;
pub mod plan;
pub mod venue;
pub mod wallet;

#[cfg(test)]
pub(crate) mod mock;

pub use balances::{diff, BalanceAccountant, BalanceDelta, BalanceEntry, BalanceSnapshot};
pub use loan::{loan_receipt, FlashLoanContract, LoanProvider, LoanReceipt, LoanRequest};
pub use orchestrator::{ArbitrageOrchestrator, ArbitrageResult, AttemptFailure, Residual, Stage, Verdict};
pub use plan::{ArbitragePlan, SwapLeg, Venue, VenueKind};
pub use venue::{ContractLegs, LegExecutor, LegFailure, LegRunner, RouterVenue, SwapVenue};
pub use wallet::{WalletArbitrage, WalletRunResult};
