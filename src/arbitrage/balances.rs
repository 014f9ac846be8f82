//! Balance Accountant
//!
//! Captures `(asset, holder)` balances before and after an attempt and
//! diffs them. Raw integer balances are converted to exact decimals at each
//! asset's scale before subtraction, so deltas of different assets are
//! directly comparable in human units.
//!
//! Created: 2026-10-15

use crate::chain::ChainReader;
use crate::error::{ArbError, ConfigError};
use crate::types::TokenInfo;
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Highest scale a `Decimal` can carry
pub const MAX_DECIMALS: u8 = 28;

/// Convert a raw token amount to an exact decimal at the token's scale.
pub fn to_decimal(raw: U256, token: Address, decimals: u8, holder: Address) -> Result<Decimal, ConfigError> {
    if decimals > MAX_DECIMALS {
        return Err(ConfigError::UnsupportedDecimals { token, decimals });
    }
    let overflow = || ConfigError::BalanceOverflow { token, holder };

    let mantissa = i128::try_from(raw).map_err(|_| overflow())?;
    Decimal::try_from_i128_with_scale(mantissa, decimals as u32).map_err(|_| overflow())
}

/// Balance (or balance change) of one asset held by one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceEntry {
    pub asset: Address,
    pub symbol: String,
    pub holder: Address,
    pub amount: Decimal,
}

/// Balances of a fixed `(asset, holder)` set at one point in time.
/// Entries are unique and sorted by `(asset, holder)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub entries: Vec<BalanceEntry>,
    pub taken_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(mut entries: Vec<BalanceEntry>) -> Self {
        entries.sort_by_key(|e| (e.asset, e.holder));
        entries.dedup_by_key(|e| (e.asset, e.holder));
        Self {
            entries,
            taken_at: Utc::now(),
        }
    }

    pub fn get(&self, asset: Address, holder: Address) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.asset == asset && e.holder == holder)
            .map(|e| e.amount)
    }

    fn keys(&self) -> impl Iterator<Item = (Address, Address)> + '_ {
        self.entries.iter().map(|e| (e.asset, e.holder))
    }
}

/// Per-entry change between two snapshots of the same set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDelta {
    pub entries: Vec<BalanceEntry>,
}

impl BalanceDelta {
    /// Change of `asset` summed over all holders
    pub fn asset_total(&self, asset: Address) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.asset == asset)
            .map(|e| e.amount)
            .sum()
    }

    /// `(asset, symbol, total change)` per asset, in asset order
    pub fn by_asset(&self) -> Vec<(Address, String, Decimal)> {
        let mut totals: Vec<(Address, String, Decimal)> = Vec::new();
        for entry in &self.entries {
            match totals.iter_mut().find(|(asset, _, _)| *asset == entry.asset) {
                Some((_, _, total)) => *total += entry.amount,
                None => totals.push((entry.asset, entry.symbol.clone(), entry.amount)),
            }
        }
        totals
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|e| e.amount.is_zero())
    }
}

/// `after - before`, entry by entry.
///
/// Both snapshots must cover exactly the same `(asset, holder)` set.
pub fn diff(before: &BalanceSnapshot, after: &BalanceSnapshot) -> Result<BalanceDelta, ArbError> {
    if !before.keys().eq(after.keys()) {
        return Err(ConfigError::MismatchedSnapshots.into());
    }

    let entries = before
        .entries
        .iter()
        .zip(&after.entries)
        .map(|(b, a)| {
            let amount = a
                .amount
                .checked_sub(b.amount)
                .ok_or(ConfigError::BalanceOverflow {
                    token: b.asset,
                    holder: b.holder,
                })?;
            Ok(BalanceEntry {
                asset: b.asset,
                symbol: b.symbol.clone(),
                holder: b.holder,
                amount,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(BalanceDelta { entries })
}

/// Reads balance snapshots from the chain
pub struct BalanceAccountant<C: ?Sized> {
    source: Arc<C>,
}

impl<C: ChainReader + ?Sized> BalanceAccountant<C> {
    pub fn new(source: Arc<C>) -> Self {
        Self { source }
    }

    /// Balance of every asset for every holder, read in one batch so the
    /// whole snapshot reflects a single block.
    pub async fn capture(&self, assets: &[TokenInfo], holders: &[Address]) -> Result<BalanceSnapshot, ArbError> {
        let keys: Vec<(&TokenInfo, Address)> = assets
            .iter()
            .flat_map(|token| holders.iter().map(move |&holder| (token, holder)))
            .collect();
        let pairs: Vec<(Address, Address)> = keys.iter().map(|(token, holder)| (token.address, *holder)).collect();

        let raw = self.source.balances_of(&pairs).await?;

        let entries = keys
            .into_iter()
            .zip(raw)
            .map(|((token, holder), raw)| {
                Ok(BalanceEntry {
                    asset: token.address,
                    symbol: token.symbol.clone(),
                    holder,
                    amount: to_decimal(raw, token.address, token.decimals, holder)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let snapshot = BalanceSnapshot::new(entries);
        debug!(
            "Captured {} balances ({} assets x {} holders)",
            snapshot.entries.len(),
            assets.len(),
            holders.len()
        );
        Ok(snapshot)
    }
}
