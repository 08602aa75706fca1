//! BMP-531 mirrored-ledger adapter.
//!
//! The 531 ledger is the alternate book of the same settlement bank. It
//! speaks the BMP wire family against its own base endpoint, with one
//! deliberate difference: every amount is reported in centavos (minor
//! units), so this adapter overrides `normalize_amount`. The mirror does
//! not expose PIX key listing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::InstitutionSettings;
use crate::errors::ErrorCode;
use crate::models::{
    Balance, Capability, PixChargeRequest, PixPayment, PixQrCode, ProviderResult, StandardFilters,
    Statement, Transaction,
};
use crate::provider::bmp::{
    map_movimento, map_saldo, map_status, refine_payment_failure, statement_query,
};
use crate::provider::bmp::models::{
    ExtratoResponse, Movimento, PagamentoPixResponse, QrCodeResponse, SaldoResponse,
};
use crate::provider::{BankingProvider, ProviderCore};
use crate::token::TokenStore;

/// BMP-531 mirrored-ledger provider.
pub struct Bmp531Provider {
    core: ProviderCore,
}

impl Bmp531Provider {
    pub fn new(settings: InstitutionSettings, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            core: ProviderCore::new(settings, tokens),
        }
    }
}

#[async_trait]
impl BankingProvider for Bmp531Provider {
    fn institution(&self) -> crate::models::Institution {
        self.core.institution()
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.core.settings().capabilities
    }

    fn is_configured(&self) -> bool {
        self.core.is_configured()
    }

    /// The 531 ledger reports centavos; scale down to currency units.
    fn normalize_amount(&self, raw: &serde_json::Value) -> Option<Decimal> {
        crate::models::decimal_from_value(raw).map(|amount| amount / Decimal::from(100))
    }

    async fn get_balance(&self) -> ProviderResult<Balance> {
        let body = self.core.get("/saldo", &[]).await?;
        let saldo: SaldoResponse = self.core.parse(body.clone())?;
        let balance = map_saldo(self, body, saldo)?;
        self.core.success(balance)
    }

    async fn get_statement(&self, filters: &StandardFilters) -> ProviderResult<Statement> {
        if let Err(message) = filters.validate() {
            return self.core.failure(ErrorCode::InvalidFilters, message);
        }

        let query = statement_query(filters);
        let body = self.core.get("/extrato", &query).await?;
        let extrato: ExtratoResponse = self.core.parse(body)?;

        let account_id = extrato.conta.clone();
        let transactions = extrato
            .movimentos
            .into_iter()
            .filter_map(|m| map_movimento(self, &account_id, "BRL", m))
            .collect();

        self.core.success(Statement::assemble(
            self.institution(),
            account_id,
            transactions,
            extrato.proximo_cursor,
            extrato.tem_mais,
            extrato.total,
        ))
    }

    async fn get_transaction(&self, transaction_id: &str) -> ProviderResult<Transaction> {
        let body = self
            .core
            .get(&format!("/transacoes/{transaction_id}"), &[])
            .await?;
        let movimento: Movimento = self.core.parse(body)?;
        let account_id = movimento
            .extra
            .get("conta")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        match map_movimento(self, &account_id, "BRL", movimento) {
            Some(transaction) => self.core.success(transaction),
            None => self.core.failure(
                ErrorCode::UnknownError,
                format!("movement {transaction_id} could not be translated"),
            ),
        }
    }

    async fn send_pix(&self, charge: &PixChargeRequest) -> ProviderResult<PixPayment> {
        if let Err((code, message)) = charge.validate() {
            return self.core.failure(code, message);
        }
        let key_type = charge.effective_key_type();

        let body = serde_json::json!({
            "chave": charge.key,
            "tipoChave": key_type.as_str(),
            // the mirror expects centavos on the wire as well
            "valor": (charge.amount * Decimal::from(100)).trunc(),
            "descricao": charge.description,
        });

        let response = self
            .core
            .post("/pix/pagamentos", &body)
            .await
            .map_err(refine_payment_failure)?;
        let payment: PagamentoPixResponse = self.core.parse(response)?;

        let amount = self
            .normalize_amount(&payment.valor)
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
            "valor": (amount * Decimal::from(100)).trunc(),
            "descricao": description,
        });
        let response = self.core.post("/pix/qrcode", &body).await?;
        let qr: QrCodeResponse = self.core.parse(response)?;

        self.core.success(PixQrCode {
            payload: qr.payload,
            txid: qr.txid,
            amount: self.normalize_amount(&qr.valor).unwrap_or(amount),
            expires_at: qr.expira_em,
        })
    }
}
