//! Transaction confirmation
//!
//! Every write in the crate (approvals, router swaps, flash-loan requests)
//! waits for its receipt through [`wait_for_receipt`], bounded by a timeout.
//! A timeout or transport error there is an external-call failure. What a
//! mined-but-reverted transaction means is up to the caller: [`confirm`]
//! treats it as a failed call, settlement paths classify it themselves.

use crate::error::ArbError;
use alloy::network::Ethereum;
use alloy::primitives::TxHash;
use alloy::providers::PendingTransactionBuilder;
use alloy::rpc::types::TransactionReceipt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait for a receipt before the write is treated as failed
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Wait for `pending` to be mined. The receipt may carry a reverted status.
pub async fn wait_for_receipt(
    pending: PendingTransactionBuilder<Ethereum>,
    timeout: Duration,
    what: &str,
) -> Result<TransactionReceipt, ArbError> {
    let tx_hash = *pending.tx_hash();
    info!("{} tx submitted: {:?}", what, tx_hash);

    let receipt = tokio::time::timeout(timeout, pending.get_receipt())
        .await
        .map_err(ArbError::external(format!("{} {:?} not confirmed within {:?}", what, tx_hash, timeout)))?
        .map_err(ArbError::external(format!("{} {:?} confirmation failed", what, tx_hash)))?;

    if receipt.status() {
        debug!(
            "{} confirmed: {:?} (block {:?}, gas {})",
            what, tx_hash, receipt.block_number, receipt.gas_used
        );
    } else {
        warn!("{} reverted: {:?} (block {:?})", what, tx_hash, receipt.block_number);
    }
    Ok(receipt)
}

/// Wait for `pending` to be mined and check that it did not revert.
pub async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    timeout: Duration,
    what: &str,
) -> Result<TransactionReceipt, ArbError> {
    let receipt = wait_for_receipt(pending, timeout, what).await?;
    check_status(receipt.status(), receipt.transaction_hash, what)?;
    Ok(receipt)
}

/// A reverted write treated as a failed external call.
pub fn check_status(succeeded: bool, tx_hash: TxHash, what: &str) -> Result<(), ArbError> {
    if succeeded {
        return Ok(());
    }
    Err(ArbError::ExternalCall {
        context: format!("{} {:?}", what, tx_hash),
        source: "transaction reverted".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverted_write_is_external_failure() {
        let tx_hash = TxHash::repeat_byte(0xab);

        assert!(check_status(true, tx_hash, "Approval").is_ok());

        let err = check_status(false, tx_hash, "Approval").unwrap_err();
        assert!(matches!(err, ArbError::ExternalCall { ref context, .. } if context.starts_with("Approval")));
        assert!(!err.is_caller_bug());
    }
}
