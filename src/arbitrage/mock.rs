//! Test venue that swaps at fixed rates and moves balances on a [`MockChain`].

use super::plan::SwapLeg;
use super::venue::SwapVenue;
use crate::chain::mock::MockChain;
use crate::error::ArbError;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) struct MockVenue {
    chain: Arc<MockChain>,
    holder: Address,
    /// (token_in, token_out) -> (numerator, denominator); 1:1 when absent
    rates: HashMap<(Address, Address), (u64, u64)>,
    calls: Mutex<Vec<U256>>,
}

impl MockVenue {
    pub fn new(chain: Arc<MockChain>, holder: Address) -> Self {
        Self {
            chain,
            holder,
            rates: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rate(mut self, token_in: Address, token_out: Address, num: u64, den: u64) -> Self {
        self.rates.insert((token_in, token_out), (num, den));
        self
    }

    /// `amount_in` of every swap so far
    pub fn calls(&self) -> Vec<U256> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapVenue for MockVenue {
    async fn swap(&self, leg: &SwapLeg, amount_in: U256) -> Result<U256, ArbError> {
        self.calls.lock().unwrap().push(amount_in);

        let (num, den) = self
            .rates
            .get(&(leg.token_in, leg.token_out))
            .copied()
            .unwrap_or((1, 1));
        let amount_out = amount_in * U256::from(num) / U256::from(den);

        self.chain.debit(leg.token_in, self.holder, amount_in);
        self.chain.credit(leg.token_out, self.holder, amount_out);
        Ok(amount_out)
    }
}
