//! Wallet gateway seam.
//!
//! Submission to a destination network is owned by an external wallet
//! service. Withdraw processing only needs to hand it `(public key, amount)`
//! pairs for one chain and learn whether the submission was accepted.

use async_trait::async_trait;
use custody_shared::ErrorKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One payout in a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutput {
    /// Withdraw this payout settles.
    pub withdraw_id: i64,
    /// Destination address.
    pub public_key: String,
    /// Amount to send.
    pub amount: Decimal,
}

/// Gateway acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Network transaction id.
    pub tx_id: String,
}

/// Errors returned by the wallet gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway refused the submission.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// The gateway could not be reached or failed.
    #[error("Wallet gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }
}

/// External settlement submission API.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Submits all outputs for `chain` as one settlement.
    async fn submit(
        &self,
        chain: &str,
        outputs: &[SettlementOutput],
    ) -> Result<SettlementReceipt, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedGateway;

    #[async_trait]
    impl WalletGateway for FixedGateway {
        async fn submit(
            &self,
            chain: &str,
            outputs: &[SettlementOutput],
        ) -> Result<SettlementReceipt, GatewayError> {
            if outputs.is_empty() {
                return Err(GatewayError::Rejected("no outputs".to_string()));
            }
            Ok(SettlementReceipt {
                tx_id: format!("{chain}-{}", outputs.len()),
            })
        }
    }

    #[tokio::test]
    async fn test_gateway_object_safety() {
        let gateway: Box<dyn WalletGateway> = Box::new(FixedGateway);
        let receipt = gateway
            .submit(
                "bitcoin",
                &[SettlementOutput {
                    withdraw_id: 1,
                    public_key: "bc1q".to_string(),
                    amount: dec!(0.1),
                }],
            )
            .await
            .unwrap();
        assert_eq!(receipt.tx_id, "bitcoin-1");
        assert!(gateway.submit("bitcoin", &[]).await.is_err());
    }
}
