//! Standard model shared by every institution adapter.
//!
//! These are the value types the rest of the console works with. Adapters
//! translate their institution's wire format into this model and back; no
//! institution-specific shape leaks past the provider layer.

mod balance;
mod envelope;
mod filters;
mod pix;
mod statement;
mod transaction;
mod transfer;
mod types;

pub use balance::Balance;
pub use envelope::{Envelope, ProviderResult, RequestId};
pub use filters::StandardFilters;
pub use pix::{
    emv_qr_payload, PixChargeRequest, PixKeyInfo, PixKeyType, PixPayment, PixQrCode,
};
pub use statement::{Statement, StatementSummary};
pub use transaction::{Counterparty, PixDetails, Transaction, TransactionStatus, TransactionType};
pub use transfer::{TransferReceipt, TransferRequest};
pub use types::{Capability, HealthReport, Institution};

use rust_decimal::Decimal;

/// Parse an amount out of a raw JSON value.
///
/// Accepts integers, floats and decimal strings. Scaling (e.g. minor-unit
/// wire formats) is the caller's concern.
pub(crate) fn decimal_from_value(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}
