//! Wallet gateway used by the worker binary.

use async_trait::async_trait;
use custody_core::settlement::{GatewayError, SettlementOutput, SettlementReceipt, WalletGateway};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Gateway that logs each submission and acknowledges it with a fresh id.
///
/// Settlement itself happens in the wallet service, which reads submissions
/// from these log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingGateway;

#[async_trait]
impl WalletGateway for LoggingGateway {
    async fn submit(
        &self,
        chain: &str,
        outputs: &[SettlementOutput],
    ) -> Result<SettlementReceipt, GatewayError> {
        if outputs.is_empty() {
            return Err(GatewayError::Rejected("no outputs".to_string()));
        }
        let total: Decimal = outputs.iter().map(|output| output.amount).sum();
        let tx_id = Uuid::new_v4().simple().to_string();
        for output in outputs {
            tracing::debug!(
                withdraw_id = output.withdraw_id,
                public_key = %output.public_key,
                amount = %output.amount,
                "settlement output"
            );
        }
        tracing::info!(chain, outputs = outputs.len(), total = %total, tx_id, "settlement submitted");
        Ok(SettlementReceipt { tx_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_submit_returns_distinct_ids() {
        let outputs = [SettlementOutput {
            withdraw_id: 1,
            public_key: "bc1q".to_string(),
            amount: dec!(0.1),
        }];
        let first = LoggingGateway.submit("bitcoin", &outputs).await.unwrap();
        let second = LoggingGateway.submit("bitcoin", &outputs).await.unwrap();
        assert_ne!(first.tx_id, second.tx_id);
        assert!(LoggingGateway.submit("bitcoin", &[]).await.is_err());
    }
}
