use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionStatus;

/// Internal account-to-account transfer request.
///
/// Only the settlement bank declares the `Transfer` capability today.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub destination_account: String,
    pub destination_document: Option<String>,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn validate(&self) -> Result<(), (crate::errors::ErrorCode, String)> {
        if self.destination_account.trim().is_empty() {
            return Err((
                crate::errors::ErrorCode::InvalidParameters,
                "destination account is required".to_string(),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err((
                crate::errors::ErrorCode::InvalidAmount,
                format!("transfer amount must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}

/// Receipt for an accepted transfer.
#[derive(Clone, Debug, Serialize)]
pub struct TransferReceipt {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub amount: Decimal,
}
