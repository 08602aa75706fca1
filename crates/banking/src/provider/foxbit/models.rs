//! Wire models for the Foxbit PIX rail API.
//!
//! Amounts arrive as decimal strings and timestamps as unix epoch seconds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub account_id: String,
    pub currency: Option<String>,
    pub available: serde_json::Value,
    #[serde(default)]
    pub locked: serde_json::Value,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LedgerResponse {
    pub entries: Vec<LedgerEntry>,
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    pub total: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LedgerEntry {
    pub id: String,
    pub external_id: Option<String>,
    pub amount: serde_json::Value,
    /// `deposit` or `withdrawal`.
    pub side: String,
    pub status: String,
    pub description: Option<String>,
    /// Unix epoch seconds.
    pub created_at: i64,
    pub counterparty_name: Option<String>,
    pub counterparty_document: Option<String>,
    pub pix_key: Option<String>,
    pub pix_key_type: Option<String>,
    pub end_to_end_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentResponse {
    pub id: String,
    pub end_to_end_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeysResponse {
    pub keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub created_at: Option<i64>,
}

/// QR charge components; the adapter assembles the EMV payload itself.
#[derive(Debug, Deserialize)]
pub(crate) struct QrResponse {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub amount: serde_json::Value,
    pub merchant_name: Option<String>,
    pub expires_at: Option<i64>,
}
