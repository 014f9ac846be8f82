//! Fixed-Point Price Engine
//!
//! Turns raw pool state (reserves, sqrtPriceX96) into human-comparable
//! exchange rates between two tokens of possibly different decimal scales.
//!
//! Prices are f64. Raw integers are split exactly into whole and fractional
//! parts before the float conversion so that small reserves keep their
//! fractional digits; very large values lose trailing digits like any f64.
//!
//! Zero liquidity is not an error: the affected directions are `None`.
//!
//! Created: 2026-10-15

use crate::error::{ArbError, ConfigError};
use crate::types::{PairPrice, PoolReference};
use alloy::primitives::U256;

/// 2^96 as f64, the Q64.96 scaling factor
const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Largest power of ten that fits in a U256
const MAX_EXACT_DECIMALS: u8 = 77;

/// Convert a U256 to f64 (nearest, rounding per limb)
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}

/// Scale a raw token amount down by `10^decimals`.
pub fn normalize(raw: U256, decimals: u8) -> f64 {
    if decimals > MAX_EXACT_DECIMALS {
        return u256_to_f64(raw) / 10f64.powi(decimals as i32);
    }

    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / scale;
    let frac = raw % scale;

    u256_to_f64(whole) + u256_to_f64(frac) / 10f64.powi(decimals as i32)
}

/// Constant-product (x * y = k) spot price from raw reserves.
///
/// `token0_in_token1 = reserve1 / reserve0` and `token1_in_token0 = reserve0 / reserve1`
/// after decimal normalization. If either reserve is zero both directions
/// are unavailable.
pub fn constant_product_price(reserve0: U256, reserve1: U256, decimals0: u8, decimals1: u8) -> PairPrice {
    if reserve0.is_zero() || reserve1.is_zero() {
        return PairPrice::UNAVAILABLE;
    }

    let r0 = normalize(reserve0, decimals0);
    let r1 = normalize(reserve1, decimals1);

    PairPrice {
        token0_in_token1: finite(r1 / r0),
        token1_in_token0: finite(r0 / r1),
    }
}

/// Concentrated-liquidity spot price from `sqrtPriceX96`.
///
/// `adjusted = (sqrtPriceX96 / 2^96)^2 * 10^(decimals0 - decimals1)` is the
/// price of one token0 in token1. The inverse is unavailable when `adjusted`
/// is zero.
pub fn concentrated_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> PairPrice {
    let sqrt_price = u256_to_f64(sqrt_price_x96) / Q96;
    let raw_price = sqrt_price * sqrt_price;
    let adjusted = raw_price * 10f64.powi(decimals0 as i32 - decimals1 as i32);

    let inverse = if adjusted == 0.0 { None } else { finite(1.0 / adjusted) };

    PairPrice {
        token0_in_token1: finite(adjusted),
        token1_in_token0: inverse,
    }
}

/// Price of one unit of the token named `symbol`, expressed in the other
/// token of the pair.
///
/// Returns `Ok(None)` if the price is unavailable and
/// `ConfigError::NoReferenceAsset` if neither token carries `symbol`.
pub fn price_of(pool: &PoolReference, price: &PairPrice, symbol: &str) -> Result<Option<f64>, ArbError> {
    if pool.token0.symbol == symbol {
        Ok(price.token0_in_token1)
    } else if pool.token1.symbol == symbol {
        Ok(price.token1_in_token0)
    } else {
        Err(ConfigError::NoReferenceAsset {
            symbol: symbol.to_string(),
            token0: pool.token0.symbol.clone(),
            token1: pool.token1.symbol.clone(),
        }
        .into())
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PoolKind, TokenInfo};
    use alloy::primitives::Address;

    fn e(n: u64, decimals: u8) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(decimals))
    }

    fn weth_usdc() -> PoolReference {
        PoolReference {
            address: Address::repeat_byte(0xaa),
            kind: PoolKind::ConstantProduct,
            token0: TokenInfo::new(Address::repeat_byte(1), 18, "WETH", "Wrapped Ether"),
            token1: TokenInfo::new(Address::repeat_byte(2), 6, "USDC", "USD Coin"),
            fee: None,
        }
    }

    #[test]
    fn test_normalize_keeps_fraction() {
        assert_eq!(normalize(e(2000, 18), 18), 2000.0);
        assert_eq!(normalize(U256::from(1_500_000u64), 6), 1.5);
        assert_eq!(normalize(U256::from(5u64), 1), 0.5);
        assert_eq!(normalize(U256::ZERO, 18), 0.0);
    }

    #[test]
    fn test_u256_to_f64_multi_limb() {
        assert_eq!(u256_to_f64(U256::from(1u64) << 64), 18_446_744_073_709_551_616.0);
        assert_eq!(u256_to_f64(U256::from(1u64) << 96), Q96);
    }

    #[test]
    fn test_constant_product_weth_usdc() {
        // 2000 WETH (18 dec) against 4,000,000 USDC (6 dec)
        let price = constant_product_price(e(2000, 18), e(4_000_000, 6), 18, 6);
        assert_eq!(price.token1_in_token0, Some(0.0005));
        assert_eq!(price.token0_in_token1, Some(2000.0));
    }

    #[test]
    fn test_constant_product_zero_reserve_is_unavailable() {
        assert_eq!(constant_product_price(e(10, 18), U256::ZERO, 18, 6), PairPrice::UNAVAILABLE);
        assert_eq!(constant_product_price(U256::ZERO, e(10, 6), 18, 6), PairPrice::UNAVAILABLE);
    }

    #[test]
    fn test_concentrated_price_at_parity() {
        // sqrtPriceX96 == 2^96 means raw price 1
        let price = concentrated_price(U256::from(1u64) << 96, 18, 18);
        assert_eq!(price.token0_in_token1, Some(1.0));
        assert_eq!(price.token1_in_token0, Some(1.0));
    }

    #[test]
    fn test_concentrated_price_decimal_adjustment() {
        // USDC (6) as token0, WETH (18) as token1, 1 WETH = 4000 USDC
        let sqrt = U256::from(1_252_707_241_875_239_655_932_069_007_848_032u128);
        let price = concentrated_price(sqrt, 6, 18);
        let usdc_in_weth = price.token0_in_token1.unwrap();
        assert!((usdc_in_weth - 0.00025).abs() / 0.00025 < 1e-9, "{}", usdc_in_weth);
        assert!((price.token1_in_token0.unwrap() - 4000.0).abs() < 1e-5);
    }

    #[test]
    fn test_concentrated_inverse_product_is_one() {
        for sqrt in [
            U256::from(1u64) << 80,
            U256::from(1u64) << 96,
            U256::from(123_456_789_012_345_678_901_234_567u128),
            U256::from(1u64) << 120,
        ] {
            for (d0, d1) in [(18, 18), (6, 18), (18, 6), (8, 18)] {
                let p = concentrated_price(sqrt, d0, d1);
                let product = p.token0_in_token1.unwrap() * p.token1_in_token0.unwrap();
                assert!((product - 1.0).abs() < 1e-12, "sqrt {} d0 {} d1 {}", sqrt, d0, d1);
            }
        }
    }

    #[test]
    fn test_concentrated_zero_sqrt_price() {
        let price = concentrated_price(U256::ZERO, 18, 6);
        assert_eq!(price.token0_in_token1, Some(0.0));
        assert_eq!(price.token1_in_token0, None);
    }

    #[test]
    fn test_price_of_selects_direction() {
        let pool = weth_usdc();
        let price = constant_product_price(e(2000, 18), e(4_000_000, 6), 18, 6);

        assert_eq!(price_of(&pool, &price, "WETH").unwrap(), Some(2000.0));
        assert_eq!(price_of(&pool, &price, "USDC").unwrap(), Some(0.0005));
    }

    #[test]
    fn test_price_of_unknown_symbol() {
        let pool = weth_usdc();
        let err = price_of(&pool, &PairPrice::UNAVAILABLE, "DAI").unwrap_err();
        assert!(matches!(
            err,
            ArbError::Configuration(ConfigError::NoReferenceAsset { ref symbol, .. }) if symbol == "DAI"
        ));
    }
}
