//! Arbitrage Plan
//!
//! An ordered chain of swap legs funded by a flash loan. A valid plan is a
//! closed loop: the first leg spends the loan asset, each leg spends what
//! the previous one produced, and the last leg buys the loan asset back.
//!
//! The plan travels to the loan provider as one opaque payload, the ABI
//! encoding of `requestFlashLoanArbitrage(params)`.
//!
//! Created: 2026-10-15

use crate::contracts::{fee_to_u24, IFlashLoanArbitrage};
use crate::error::{ArbError, ConfigError};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Router family a leg is swapped through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    /// `swapExactTokensForTokens` router
    ConstantProductRouter,
    /// `exactInputSingle` router, needs a fee tier
    ConcentratedLiquidityRouter,
}

impl VenueKind {
    /// Discriminant used in the on-chain `SwapStep.venueKind`
    pub fn as_u8(self) -> u8 {
        match self {
            VenueKind::ConstantProductRouter => 0,
            VenueKind::ConcentratedLiquidityRouter => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(VenueKind::ConstantProductRouter),
            1 => Some(VenueKind::ConcentratedLiquidityRouter),
            _ => None,
        }
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VenueKind::ConstantProductRouter => write!(f, "V2"),
            VenueKind::ConcentratedLiquidityRouter => write!(f, "V3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub kind: VenueKind,
    pub router: Address,
}

/// One swap of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapLeg {
    pub token_in: Address,
    pub token_out: Address,
    pub venue: Venue,
    /// Fee tier for concentrated-liquidity venues
    pub fee: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitragePlan {
    pub loan_asset: Address,
    /// Raw units of the loan asset
    pub amount: U256,
    pub legs: Vec<SwapLeg>,
}

impl ArbitragePlan {
    /// Check the closed-loop and leg-chaining invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (first, last) = match (self.legs.first(), self.legs.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ConfigError::EmptyPlan),
        };

        if self.amount.is_zero() {
            return Err(ConfigError::ZeroLoanAmount);
        }

        if first.token_in != self.loan_asset || last.token_out != self.loan_asset {
            return Err(ConfigError::OpenLoop {
                loan_asset: self.loan_asset,
                first_in: first.token_in,
                last_out: last.token_out,
            });
        }

        for (i, pair) in self.legs.windows(2).enumerate() {
            if pair[0].token_out != pair[1].token_in {
                return Err(ConfigError::BrokenChain {
                    leg: i,
                    token_out: pair[0].token_out,
                    next_in: pair[1].token_in,
                });
            }
        }

        if let Some(i) = self
            .legs
            .iter()
            .position(|leg| leg.venue.kind == VenueKind::ConcentratedLiquidityRouter && leg.fee.is_none())
        {
            return Err(ConfigError::MissingFeeTier(i));
        }

        Ok(())
    }

    /// Every asset the plan touches, loan asset first, without duplicates.
    pub fn assets(&self) -> Vec<Address> {
        let mut assets = vec![self.loan_asset];
        for leg in &self.legs {
            for token in [leg.token_in, leg.token_out] {
                if !assets.contains(&token) {
                    assets.push(token);
                }
            }
        }
        assets
    }

    pub fn to_params(&self) -> IFlashLoanArbitrage::ArbitrageParams {
        IFlashLoanArbitrage::ArbitrageParams {
            loanAsset: self.loan_asset,
            amount: self.amount,
            steps: self
                .legs
                .iter()
                .map(|leg| IFlashLoanArbitrage::SwapStep {
                    tokenIn: leg.token_in,
                    tokenOut: leg.token_out,
                    router: leg.venue.router,
                    venueKind: leg.venue.kind.as_u8(),
                    fee: fee_to_u24(leg.fee.unwrap_or(0)),
                })
                .collect(),
        }
    }

    /// Calldata for `requestFlashLoanArbitrage(params)`
    pub fn encode_payload(&self) -> Bytes {
        IFlashLoanArbitrage::requestFlashLoanArbitrageCall {
            params: self.to_params(),
        }
        .abi_encode()
        .into()
    }

    /// Inverse of [`encode_payload`](Self::encode_payload).
    pub fn decode_payload(payload: &[u8]) -> Result<Self, ArbError> {
        let call = IFlashLoanArbitrage::requestFlashLoanArbitrageCall::abi_decode(payload)
            .map_err(|e| ConfigError::InvalidPayload(e.to_string()))?;
        let params = call.params;

        let legs = params
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                let kind = VenueKind::from_u8(step.venueKind).ok_or_else(|| {
                    ConfigError::InvalidPayload(format!("leg {} has unknown venue kind {}", i, step.venueKind))
                })?;
                let fee = match kind {
                    VenueKind::ConcentratedLiquidityRouter => Some(step.fee.to::<u32>()),
                    VenueKind::ConstantProductRouter => None,
                };
                Ok(SwapLeg {
                    token_in: step.tokenIn,
                    token_out: step.tokenOut,
                    venue: Venue {
                        kind,
                        router: step.router,
                    },
                    fee,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            loan_asset: params.loanAsset,
            amount: params.amount,
            legs,
        })
    }

    /// "A -V3(500)-> B -V2-> A" style route label
    pub fn route(&self) -> String {
        let mut route = format!("{:?}", self.loan_asset);
        for leg in &self.legs {
            match leg.fee {
                Some(fee) => route.push_str(&format!(" -{}({})-> {:?}", leg.venue.kind, fee, leg.token_out)),
                None => route.push_str(&format!(" -{}-> {:?}", leg.venue.kind, leg.token_out)),
            }
        }
        route
    }
}
