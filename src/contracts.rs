//! Centralized Contract Definitions
//!
//! All Solidity interfaces used by the reader, the scanner and the
//! arbitrage path, defined with alloy's `sol!` macro.
//!
//! Each interface is annotated with `#[sol(rpc)]` to generate
//! contract instance types that can make RPC calls via any alloy Provider.
//!
//! Created: 2026-10-15

use alloy::primitives::aliases::U24;
use alloy::primitives::{address, Address, Uint};
use alloy::sol;

/// Multicall3 deployed address (same on all EVM chains)
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Convert a u32 fee tier to the uint24 type used by contract calls.
/// Uses from_limbs() because Uint<24, 1> doesn't impl From<u32>.
pub fn fee_to_u24(fee: u32) -> U24 {
    debug_assert!(fee <= 0xFFFFFF, "fee {} exceeds U24 max (16777215)", fee);
    Uint::from_limbs([fee as u64])
}

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
    }
}

// ── Uniswap V2 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}

// ── Uniswap V3 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface UniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }
}

sol! {
    #[sol(rpc)]
    interface UniswapV3Pool {
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked);
        function liquidity() external view returns (uint128);
        function fee() external view returns (uint24);
        function tickSpacing() external view returns (int24);
        function tickBitmap(int16 wordPosition) external view returns (uint256);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}

// ── Multicall3 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

// ── Flash-loan arbitrage receiver (custom contract) ──────────────────

sol! {
    #[sol(rpc)]
    interface IFlashLoanArbitrage {
        struct SwapStep {
            address tokenIn;
            address tokenOut;
            address router;
            uint8 venueKind;
            uint24 fee;
        }

        struct ArbitrageParams {
            address loanAsset;
            uint256 amount;
            SwapStep[] steps;
        }

        /// Borrows `params.amount` of `params.loanAsset`, runs every step in
        /// order inside the loan callback and repays principal plus premium.
        function requestFlashLoanArbitrage(ArbitrageParams calldata params) external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_to_u24() {
        assert_eq!(fee_to_u24(3000).to::<u32>(), 3000);
        assert_eq!(fee_to_u24(0xFFFFFF).to::<u32>(), 0xFFFFFF);
    }
}
