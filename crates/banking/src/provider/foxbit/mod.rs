//! Foxbit PIX-rail adapter.
//!
//! Foxbit operates the crypto-exchange PIX rail. Authentication is
//! bearer-only; amounts travel as decimal strings and timestamps as unix
//! epoch seconds. The QR endpoint returns charge components, so this
//! adapter assembles the EMV payload locally.
//!
//! # API Endpoints
//!
//! - Balance: `GET /accounts/brl`
//! - Ledger: `GET /ledger?start_time=&end_time=&limit=&cursor=`
//! - Single entry: `GET /ledger/{id}`
//! - PIX payment: `POST /pix/payments`
//! - PIX keys: `GET /pix/keys`
//! - PIX QR charge: `POST /pix/qrcodes`

pub(crate) mod models;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::InstitutionSettings;
use crate::errors::{ErrorCode, ProviderError};
use crate::models::{
    emv_qr_payload, Balance, Capability, Counterparty, PixChargeRequest, PixDetails, PixKeyInfo,
    PixKeyType, PixPayment, PixQrCode, ProviderResult, StandardFilters, Statement, Transaction,
    TransactionStatus, TransactionType,
};
use crate::provider::{BankingProvider, ProviderCore};
use crate::token::TokenStore;

use models::{AccountResponse, KeysResponse, LedgerEntry, LedgerResponse, PaymentResponse, QrResponse};

pub(crate) fn map_status(status: &str) -> TransactionStatus {
    match status.to_ascii_lowercase().as_str() {
        "settled" | "completed" => TransactionStatus::Completed,
        "processing" | "pending" => TransactionStatus::Pending,
        "failed" | "error" => TransactionStatus::Failed,
        "canceled" | "cancelled" => TransactionStatus::Cancelled,
        _ => TransactionStatus::Pending,
    }
}

fn map_key_type(key_type: &str) -> Option<PixKeyType> {
    match key_type.to_ascii_lowercase().as_str() {
        "cpf" => Some(PixKeyType::Cpf),
        "cnpj" => Some(PixKeyType::Cnpj),
        "email" => Some(PixKeyType::Email),
        "phone" => Some(PixKeyType::Phone),
        "evp" | "random" => Some(PixKeyType::Evp),
        _ => None,
    }
}

fn epoch_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// Translate a payment rejection using Foxbit's `error.message` shape.
pub(crate) fn refine_payment_failure(error: ProviderError) -> ProviderError {
    let message = error
        .details
        .as_ref()
        .and_then(|details| details.get("error"))
        .and_then(|e| e.get("message").or_else(|| e.get("code")))
        .and_then(|value| value.as_str())
        .map(|s| s.to_lowercase());

    match message {
        Some(m) if m.contains("insufficient") => {
            error.recoded(ErrorCode::InsufficientFunds, "insufficient balance")
        }
        Some(m) if m.contains("key_not_found") || m.contains("invalid_key") => {
            error.recoded(ErrorCode::InvalidPixKey, "pix key rejected by the backend")
        }
        _ => error,
    }
}

/// Foxbit PIX-rail provider.
pub struct FoxbitProvider {
    core: ProviderCore,
}

impl FoxbitProvider {
    pub fn new(settings: InstitutionSettings, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            core: ProviderCore::new(settings, tokens),
        }
    }

    fn map_entry(&self, account_id: &str, entry: LedgerEntry) -> Option<Transaction> {
        let amount = match self.normalize_amount(&entry.amount) {
            Some(amount) => amount.abs(),
            None => {
                warn!(
                    "FOXBIT: dropping ledger entry {} with unparseable amount {:?}",
                    entry.id, entry.amount
                );
                return None;
            }
        };

        let transaction_type = match entry.side.to_ascii_lowercase().as_str() {
            "deposit" => TransactionType::Credit,
            "withdrawal" | "withdraw" => TransactionType::Debit,
            other => {
                warn!(
                    "FOXBIT: dropping ledger entry {} with unknown side {other:?}",
                    entry.id
                );
                return None;
            }
        };

        let timestamp = match epoch_to_utc(entry.created_at) {
            Some(timestamp) => timestamp,
            None => {
                warn!(
                    "FOXBIT: dropping ledger entry {} with invalid timestamp {}",
                    entry.id, entry.created_at
                );
                return None;
            }
        };

        let counterparty = if entry.counterparty_name.is_some() || entry.counterparty_document.is_some()
        {
            Some(Counterparty {
                name: entry.counterparty_name.clone(),
                document: entry.counterparty_document.clone(),
                bank: None,
            })
        } else {
            None
        };

        let pix = entry.pix_key.as_ref().map(|key| PixDetails {
            key: key.clone(),
            key_type: entry
                .pix_key_type
                .as_deref()
                .and_then(map_key_type)
                .unwrap_or_else(|| PixKeyType::infer(key)),
            end_to_end_id: entry.end_to_end_id.clone(),
        });

        let raw = serde_json::to_value(&entry).unwrap_or(serde_json::Value::Null);

        Some(Transaction {
            institution: self.institution(),
            id: entry.id,
            external_id: entry.external_id,
            account_id: account_id.to_string(),
            amount,
            transaction_type,
            currency: "BRL".to_string(),
            status: map_status(&entry.status),
            description: entry.description.unwrap_or_default(),
            timestamp,
            counterparty,
            pix,
            metadata: entry.extra,
            raw,
        })
    }

    fn ledger_query(&self, filters: &StandardFilters) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(from) = filters.date_from {
            if let Some(start) = from.and_hms_opt(0, 0, 0) {
                query.push(("start_time", self.format_date(Utc.from_utc_datetime(&start))));
            }
        }
        if let Some(to) = filters.date_to {
            if let Some(end) = to.and_hms_opt(23, 59, 59) {
                query.push(("end_time", self.format_date(Utc.from_utc_datetime(&end))));
            }
        }
        if let Some(limit) = filters.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &filters.cursor {
            query.push(("cursor", cursor.clone()));
        }
        query
    }

    fn assemble_qr(&self, qr: QrResponse, requested_amount: Decimal) -> PixQrCode {
        let amount = self.normalize_amount(&qr.amount).unwrap_or(requested_amount);
        let merchant = qr.merchant_name.as_deref().unwrap_or("PIXDESK");
        PixQrCode {
            payload: emv_qr_payload(&qr.key, amount, merchant, &qr.id),
            txid: qr.id,
            amount,
            expires_at: qr.expires_at.and_then(epoch_to_utc),
        }
    }
}

#[async_trait]
impl BankingProvider for FoxbitProvider {
    fn institution(&self) -> crate::models::Institution {
        self.core.institution()
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.core.settings().capabilities
    }

    fn is_configured(&self) -> bool {
        self.core.is_configured()
    }

    /// Foxbit encodes query timestamps as unix epoch seconds.
    fn format_date(&self, timestamp: DateTime<Utc>) -> String {
        timestamp.timestamp().to_string()
    }

    async fn get_balance(&self) -> ProviderResult<Balance> {
        let body = self.core.get("/accounts/brl", &[]).await?;
        let account: AccountResponse = self.core.parse(body.clone())?;

        let available = match self.normalize_amount(&account.available) {
            Some(amount) => amount,
            None => {
                return self.core.failure(
                    ErrorCode::UnknownError,
                    "account response is missing the available amount",
                )
            }
        };
        let locked = self
            .normalize_amount(&account.locked)
            .unwrap_or(Decimal::ZERO);
        let updated_at = account
            .updated_at
            .and_then(epoch_to_utc)
            .unwrap_or_else(Utc::now);

        self.core.success(Balance::new(
            self.institution(),
            account.account_id,
            account.currency.unwrap_or_else(|| "BRL".to_string()),
            available,
            locked,
            updated_at,
            body,
        ))
    }

    async fn get_statement(&self, filters: &StandardFilters) -> ProviderResult<Statement> {
        if let Err(message) = filters.validate() {
            return self.core.failure(ErrorCode::InvalidFilters, message);
        }

        let query = self.ledger_query(filters);
        let body = self.core.get("/ledger", &query).await?;
        let ledger: LedgerResponse = self.core.parse(body)?;

        let account_id = "brl".to_string();
        let transactions = ledger
            .entries
            .into_iter()
            .filter_map(|entry| self.map_entry(&account_id, entry))
            .collect();

        self.core.success(Statement::assemble(
            self.institution(),
            account_id,
            transactions,
            ledger.next_cursor,
            ledger.has_more,
            ledger.total,
        ))
    }

    async fn get_transaction(&self, transaction_id: &str) -> ProviderResult<Transaction> {
        let body = self
            .core
            .get(&format!("/ledger/{transaction_id}"), &[])
            .await?;
        let entry: LedgerEntry = self.core.parse(body)?;

        match self.map_entry("brl", entry) {
            Some(transaction) => self.core.success(transaction),
            None => self.core.failure(
                ErrorCode::UnknownError,
                format!("ledger entry {transaction_id} could not be translated"),
            ),
        }
    }

    async fn send_pix(&self, charge: &PixChargeRequest) -> ProviderResult<PixPayment> {
        if let Err((code, message)) = charge.validate() {
            return self.core.failure(code, message);
        }
        let key_type = charge.effective_key_type();

        let body = serde_json::json!({
            "key": charge.key,
            "key_type": key_type.as_str().to_lowercase(),
            "amount": charge.amount.to_string(),
            "description": charge.description,
        });

        let response = self
            .core
            .post("/pix/payments", &body)
            .await
            .map_err(refine_payment_failure)?;
        let payment: PaymentResponse = self.core.parse(response)?;

        let amount = self
            .normalize_amount(&payment.amount)
            .unwrap_or(charge.amount);
        self.core.success(PixPayment {
            transaction_id: payment.id,
            end_to_end_id: payment.end_to_end_id,
            status: map_status(&payment.status),
            amount,
            key: charge.key.clone(),
            key_type,
        })
    }

    async fn get_pix_keys(&self) -> ProviderResult<Vec<PixKeyInfo>> {
        let body = self.core.get("/pix/keys", &[]).await?;
        let response: KeysResponse = self.core.parse(body)?;

        let keys = response
            .keys
            .into_iter()
            .map(|entry| PixKeyInfo {
                key_type: entry
                    .key_type
                    .as_deref()
                    .and_then(map_key_type)
                    .unwrap_or_else(|| PixKeyType::infer(&entry.key)),
                key: entry.key,
                created_at: entry.created_at.and_then(epoch_to_utc),
            })
            .collect();
        self.core.success(keys)
    }

    async fn generate_pix_qr(
        &self,
        amount: Decimal,
        description: Option<&str>,
    ) -> ProviderResult<PixQrCode> {
        if amount <= Decimal::ZERO {
            return self.core.failure(
                ErrorCode::InvalidAmount,
                format!("qr amount must be positive, got {amount}"),
            );
        }

        let body = serde_json::json!({
            "amount": amount.to_string(),
            "description": description,
        });
        let response = self.core.post("/pix/qrcodes", &body).await?;
        let qr: QrResponse = self.core.parse(response)?;

        self.core.success(self.assemble_qr(qr, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigResolver, Environment};
    use crate::models::Institution;
    use crate::token::MemoryTokenStore;
    use rust_decimal_macros::dec;

    fn provider() -> FoxbitProvider {
        let resolver = ConfigResolver::new(Environment::Production);
        let settings = resolver.resolve(Institution::Foxbit, None).unwrap();
        FoxbitProvider::new(settings, Arc::new(MemoryTokenStore::new()))
    }

    #[test]
    fn test_status_table() {
        assert_eq!(map_status("settled"), TransactionStatus::Completed);
        assert_eq!(map_status("processing"), TransactionStatus::Pending);
        assert_eq!(map_status("failed"), TransactionStatus::Failed);
        assert_eq!(map_status("canceled"), TransactionStatus::Cancelled);
        assert_eq!(map_status("whatever"), TransactionStatus::Pending);
    }

    #[test]
    fn test_entry_translation() {
        let provider = provider();
        let entry: LedgerEntry = serde_json::from_value(serde_json::json!({
            "id": "le-1",
            "amount": "99.90",
            "side": "deposit",
            "status": "settled",
            "description": "pix in",
            "created_at": 1754480000,
            "pix_key": "11144477735",
            "end_to_end_id": "E2E777"
        }))
        .unwrap();

        let transaction = provider.map_entry("brl", entry).unwrap();
        assert_eq!(transaction.amount, dec!(99.90));
        assert_eq!(transaction.transaction_type, TransactionType::Credit);
        assert_eq!(transaction.status, TransactionStatus::Completed);
        assert_eq!(transaction.timestamp, epoch_to_utc(1754480000).unwrap());
        let pix = transaction.pix.unwrap();
        assert_eq!(pix.key_type, PixKeyType::Cpf);
    }

    #[test]
    fn test_withdrawal_is_debit() {
        let provider = provider();
        let entry: LedgerEntry = serde_json::from_value(serde_json::json!({
            "id": "le-2",
            "amount": "10.00",
            "side": "withdrawal",
            "status": "processing",
            "created_at": 1754480000
        }))
        .unwrap();

        let transaction = provider.map_entry("brl", entry).unwrap();
        assert_eq!(transaction.transaction_type, TransactionType::Debit);
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_unknown_side_is_dropped() {
        let provider = provider();
        let entry: LedgerEntry = serde_json::from_value(serde_json::json!({
            "id": "le-3",
            "amount": "10.00",
            "side": "swap",
            "status": "settled",
            "created_at": 1754480000
        }))
        .unwrap();
        assert!(provider.map_entry("brl", entry).is_none());
    }

    #[test]
    fn test_query_uses_epoch_seconds() {
        let provider = provider();
        let filters = StandardFilters {
            date_from: Some("2026-08-01".parse().unwrap()),
            date_to: None,
            limit: Some(10),
            cursor: None,
        };
        let query = provider.ledger_query(&filters);
        let start = query.iter().find(|(name, _)| *name == "start_time").unwrap();
        // 2026-08-01T00:00:00Z
        assert_eq!(start.1, "1785542400");
    }

    #[test]
    fn test_qr_assembly_builds_emv_payload() {
        let provider = provider();
        let qr = QrResponse {
            id: "qr-1".to_string(),
            key: "user@example.com".to_string(),
            amount: serde_json::json!("25.00"),
            merchant_name: Some("FOXBIT PAGAMENTOS".to_string()),
            expires_at: None,
        };
        let code = provider.assemble_qr(qr, dec!(25.00));
        assert_eq!(code.amount, dec!(25.00));
        assert!(code.payload.starts_with("000201"));
        assert!(code.payload.contains("user@example.com"));
        assert!(code.payload.contains("FOXBIT PAGAMENTOS"));
        assert_eq!(code.txid, "qr-1");
    }

    #[test]
    fn test_refine_insufficient_funds() {
        let error = ProviderError::from_status(
            Institution::Foxbit,
            422,
            Some(serde_json::json!({"error": {"code": "insufficient_funds", "message": "insufficient funds"}})),
        );
        assert_eq!(
            refine_payment_failure(error).code,
            ErrorCode::InsufficientFunds
        );
    }

    #[test]
    fn test_refine_unknown_key() {
        let error = ProviderError::from_status(
            Institution::Foxbit,
            404,
            Some(serde_json::json!({"error": {"code": "key_not_found"}})),
        );
        assert_eq!(refine_payment_failure(error).code, ErrorCode::InvalidPixKey);
    }
}
