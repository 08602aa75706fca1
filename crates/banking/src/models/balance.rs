use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::Institution;

/// Account balance in the standard model.
///
/// Amounts are decimal currency units regardless of how the institution's
/// wire format expresses them; converting minor units is the adapter's job.
#[derive(Clone, Debug, Serialize)]
pub struct Balance {
    pub institution: Institution,
    pub account_id: String,
    pub currency: String,
    pub available: Decimal,
    pub blocked: Decimal,
    /// Always `available + blocked`, never trusted from the wire.
    pub total: Decimal,
    pub updated_at: DateTime<Utc>,
    /// Backend payload preserved for audit.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
}

impl Balance {
    pub fn new(
        institution: Institution,
        account_id: String,
        currency: String,
        available: Decimal,
        blocked: Decimal,
        updated_at: DateTime<Utc>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            institution,
            account_id,
            currency,
            available,
            blocked,
            total: available + blocked,
            updated_at,
            raw,
        }
    }
}
