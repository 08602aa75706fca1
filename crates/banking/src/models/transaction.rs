use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::pix::PixKeyType;
use super::types::Institution;

/// Direction of a ledger movement.
///
/// Direction is carried solely by this type; `Transaction::amount` is
/// always non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// Settlement status in the standard model.
///
/// Adapters map institution-specific statuses through a small table;
/// anything unrecognized becomes `Pending` as the conservative default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
}

/// The other leg of a movement, when the institution reports one.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Counterparty {
    pub name: Option<String>,
    pub document: Option<String>,
    pub bank: Option<String>,
}

/// PIX metadata attached to a movement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PixDetails {
    pub key: String,
    pub key_type: PixKeyType,
    pub end_to_end_id: Option<String>,
}

/// A single ledger movement in the standard model.
#[derive(Clone, Debug, Serialize)]
pub struct Transaction {
    pub institution: Institution,
    pub id: String,
    /// External/reconciliation id, when the backend exposes one.
    pub external_id: Option<String>,
    pub account_id: String,
    /// Always non-negative; direction lives in `transaction_type`.
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub currency: String,
    pub status: TransactionStatus,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub counterparty: Option<Counterparty>,
    pub pix: Option<PixDetails>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
}
