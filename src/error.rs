//! Error taxonomy
//!
//! Configuration and stale-read errors are caller bugs and are never retried.
//! External-call and settlement errors abort the in-flight operation; a retry
//! is always a fresh attempt with fresh reads, decided by the caller.
//!
//! Zero liquidity is not an error: prices come back as `None` (unavailable).

use alloy::primitives::Address;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the pricing, scanning and settlement core.
#[derive(Debug, Error)]
pub enum ArbError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("pool {0} was queried before a successful refresh")]
    StaleRead(Address),

    #[error("external call failed: {context}")]
    ExternalCall {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("settlement failed: {reason}")]
    Settlement {
        /// Index of the leg that failed, when the failure is attributable to one
        leg: Option<usize>,
        reason: String,
    },
}

impl ArbError {
    /// Adapter for `map_err` on any transport/contract error.
    pub fn external<E>(context: impl Into<String>) -> impl FnOnce(E) -> ArbError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let context = context.into();
        move |err| ArbError::ExternalCall {
            context,
            source: Box::new(err),
        }
    }

    pub fn settlement(leg: Option<usize>, reason: impl Into<String>) -> Self {
        ArbError::Settlement {
            leg,
            reason: reason.into(),
        }
    }

    /// Attribute an unattributed settlement failure to leg `index`.
    pub fn at_leg(self, index: usize) -> Self {
        match self {
            ArbError::Settlement { leg: None, reason } => ArbError::Settlement {
                leg: Some(index),
                reason,
            },
            other => other,
        }
    }

    /// Leg index carried by a settlement failure, if any.
    pub fn failed_leg(&self) -> Option<usize> {
        match self {
            ArbError::Settlement { leg, .. } => *leg,
            _ => None,
        }
    }

    /// True for errors caused by the caller rather than the chain.
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, ArbError::Configuration(_) | ArbError::StaleRead(_))
    }
}

/// Every way a plan, pool or snapshot set can be misconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("arbitrage plan has no legs")]
    EmptyPlan,

    #[error("loan amount must be greater than zero")]
    ZeroLoanAmount,

    #[error("plan is not a closed loop: loan asset {loan_asset}, first leg starts with {first_in}, last leg ends with {last_out}")]
    OpenLoop {
        loan_asset: Address,
        first_in: Address,
        last_out: Address,
    },

    #[error("leg {leg} outputs {token_out} but leg {} expects {next_in}", .leg + 1)]
    BrokenChain {
        leg: usize,
        token_out: Address,
        next_in: Address,
    },

    #[error("leg {0} routes through a concentrated-liquidity venue without a fee tier")]
    MissingFeeTier(usize),

    #[error("tick spacing must be positive, got {0}")]
    InvalidTickSpacing(i32),

    #[error("before/after balance snapshots cover different asset/holder sets")]
    MismatchedSnapshots,

    #[error("no reference asset {symbol} in pair {token0}/{token1}")]
    NoReferenceAsset {
        symbol: String,
        token0: String,
        token1: String,
    },

    #[error("token {token} has {decimals} decimals, more than a balance can represent")]
    UnsupportedDecimals { token: Address, decimals: u8 },

    #[error("balance of {token} held by {holder} does not fit the balance representation")]
    BalanceOverflow { token: Address, holder: Address },

    #[error("pool {0} is not a concentrated-liquidity pool")]
    NotConcentrated(Address),

    #[error("no pool exists for {0}")]
    PoolNotFound(String),

    #[error("invalid loan payload: {0}")]
    InvalidPayload(String),
}
