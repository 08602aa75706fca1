//! BMP settlement-bank adapter.
//!
//! BMP is the default settlement institution behind the console. It
//! authenticates with an api key/secret pair on top of the session bearer
//! token and reports amounts in decimal reais.
//!
//! # API Endpoints
//!
//! - Balance: `GET /saldo`
//! - Statement: `GET /extrato?dataInicio=&dataFim=&limite=&cursor=`
//! - Single movement: `GET /transacoes/{id}`
//! - PIX payment: `POST /pix/pagamentos`
//! - PIX keys: `GET /pix/chaves`
//! - PIX QR charge: `POST /pix/qrcode`
//! - Internal transfer: `POST /transferencias`

pub(crate) mod models;

use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::InstitutionSettings;
use crate::errors::{ErrorCode, ProviderError};
use crate::models::{
    Balance, Capability, Counterparty, PixChargeRequest, PixDetails, PixKeyInfo, PixKeyType,
    PixPayment, PixQrCode, ProviderResult, StandardFilters, Statement, Transaction,
    TransactionStatus, TransactionType, TransferReceipt, TransferRequest,
};
use crate::provider::{BankingProvider, ProviderCore};
use crate::token::TokenStore;

use models::{
    ChavesPixResponse, ExtratoResponse, Movimento, PagamentoPixResponse, QrCodeResponse,
    SaldoResponse, TransferenciaResponse,
};

/// Map a BMP-family wire status into the standard model.
///
/// Anything unrecognized is `Pending`, the conservative default.
pub(crate) fn map_status(status: &str) -> TransactionStatus {
    match status.to_ascii_uppercase().as_str() {
        "LIQUIDADO" | "CONCLUIDO" | "EFETIVADO" => TransactionStatus::Completed,
        "PROCESSANDO" | "PENDENTE" | "AGENDADO" => TransactionStatus::Pending,
        "ERRO" | "FALHA" | "REJEITADO" => TransactionStatus::Failed,
        "CANCELADO" => TransactionStatus::Cancelled,
        _ => TransactionStatus::Pending,
    }
}

pub(crate) fn map_key_type(tipo: &str) -> Option<PixKeyType> {
    match tipo.to_ascii_uppercase().as_str() {
        "CPF" => Some(PixKeyType::Cpf),
        "CNPJ" => Some(PixKeyType::Cnpj),
        "EMAIL" => Some(PixKeyType::Email),
        "TELEFONE" | "CELULAR" | "PHONE" => Some(PixKeyType::Phone),
        "EVP" | "ALEATORIA" => Some(PixKeyType::Evp),
        _ => None,
    }
}

/// Translate BMP-family payment rejections into the taxonomy.
///
/// The backend reports business failures as a structured body with a
/// `mensagem` field; the raw body stays attached as details.
pub(crate) fn refine_payment_failure(error: ProviderError) -> ProviderError {
    let message = error
        .details
        .as_ref()
        .and_then(|details| details.get("mensagem").or_else(|| details.get("message")))
        .and_then(|value| value.as_str())
        .map(|s| s.to_lowercase());

    match message {
        Some(m) if m.contains("saldo insuficiente") => {
            error.recoded(ErrorCode::InsufficientFunds, "insufficient balance")
        }
        Some(m)
            if m.contains("chave")
                && (m.contains("nao encontrada")
                    || m.contains("não encontrada")
                    || m.contains("invalida")
                    || m.contains("inválida")) =>
        {
            error.recoded(ErrorCode::InvalidPixKey, "pix key rejected by the backend")
        }
        _ => error,
    }
}

/// Translate one wire movement. Returns `None` for records that cannot be
/// represented in the standard model (unparseable amount, unknown
/// direction); those are logged and dropped rather than failing the page.
pub(crate) fn map_movimento(
    provider: &impl BankingProvider,
    account_id: &str,
    currency: &str,
    movimento: Movimento,
) -> Option<Transaction> {
    let institution = provider.institution();

    let amount = match provider.normalize_amount(&movimento.valor) {
        Some(amount) => amount.abs(),
        None => {
            warn!(
                "{institution}: dropping movement {} with unparseable amount {:?}",
                movimento.id, movimento.valor
            );
            return None;
        }
    };

    let transaction_type = match movimento.natureza.to_ascii_uppercase().as_str() {
        "C" => TransactionType::Credit,
        "D" => TransactionType::Debit,
        other => {
            warn!(
                "{institution}: dropping movement {} with unknown direction {other:?}",
                movimento.id
            );
            return None;
        }
    };

    let status = map_status(&movimento.status);
    let counterparty = movimento.contraparte.as_ref().map(|c| Counterparty {
        name: c.nome.clone(),
        document: c.documento.clone(),
        bank: c.banco.clone(),
    });
    let pix = movimento.pix.as_ref().and_then(|p| {
        p.chave.as_ref().map(|key| PixDetails {
            key: key.clone(),
            key_type: p
                .tipo_chave
                .as_deref()
                .and_then(map_key_type)
                .unwrap_or_else(|| PixKeyType::infer(key)),
            end_to_end_id: p.end_to_end_id.clone(),
        })
    });

    let raw = serde_json::to_value(&movimento).unwrap_or(serde_json::Value::Null);

    Some(Transaction {
        institution,
        id: movimento.id,
        external_id: movimento.id_externo,
        account_id: account_id.to_string(),
        amount,
        transaction_type,
        currency: currency.to_string(),
        status,
        description: movimento.descricao.unwrap_or_default(),
        timestamp: movimento.data_hora,
        counterparty,
        pix,
        metadata: movimento.extra,
        raw,
    })
}

pub(crate) fn map_saldo(
    provider: &impl BankingProvider,
    raw: serde_json::Value,
    saldo: SaldoResponse,
) -> Result<Balance, ProviderError> {
    let institution = provider.institution();
    let available = provider.normalize_amount(&saldo.saldo_disponivel).ok_or_else(|| {
        ProviderError::new(
            institution,
            ErrorCode::UnknownError,
            "balance response is missing the available amount",
        )
    })?;
    let blocked = provider
        .normalize_amount(&saldo.saldo_bloqueado)
        .unwrap_or(Decimal::ZERO);

    Ok(Balance::new(
        institution,
        saldo.conta,
        saldo.moeda.unwrap_or_else(|| "BRL".to_string()),
        available,
        blocked,
        saldo.atualizado_em.unwrap_or_else(Utc::now),
        raw,
    ))
}

pub(crate) fn statement_query(filters: &StandardFilters) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(from) = filters.date_from {
        query.push(("dataInicio", from.to_string()));
    }
    if let Some(to) = filters.date_to {
        query.push(("dataFim", to.to_string()));
    }
    if let Some(limit) = filters.limit {
        query.push(("limite", limit.to_string()));
    }
    if let Some(cursor) = &filters.cursor {
        query.push(("cursor", cursor.clone()));
    }
    query
}

/// BMP settlement-bank provider.
pub struct BmpProvider {
    core: ProviderCore,
}

impl BmpProvider {
    pub fn new(settings: InstitutionSettings, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            core: ProviderCore::new(settings, tokens),
        }
    }
}

#[async_trait]
impl BankingProvider for BmpProvider {
    fn institution(&self) -> crate::models::Institution {
        self.core.institution()
    }

    fn capabilities(&self) -> &'static [Capability] {
        self.core.settings().capabilities
    }

    fn is_configured(&self) -> bool {
        self.core.is_configured()
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
            "valor": charge.amount,
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

    async fn get_pix_keys(&self) -> ProviderResult<Vec<PixKeyInfo>> {
        let body = self.core.get("/pix/chaves", &[]).await?;
        let response: ChavesPixResponse = self.core.parse(body)?;

        let keys = response
            .chaves
            .into_iter()
            .map(|chave| PixKeyInfo {
                key_type: chave
                    .tipo
                    .as_deref()
                    .and_then(map_key_type)
                    .unwrap_or_else(|| PixKeyType::infer(&chave.chave)),
                key: chave.chave,
                created_at: chave.criada_em,
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
            "valor": amount,
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

    async fn transfer(&self, request: &TransferRequest) -> ProviderResult<TransferReceipt> {
        if let Err((code, message)) = request.validate() {
            return self.core.failure(code, message);
        }

        let body = serde_json::json!({
            "contaDestino": request.destination_account,
            "documentoDestino": request.destination_document,
            "valor": request.amount,
            "descricao": request.description,
        });
        let response = self
            .core
            .post("/transferencias", &body)
            .await
            .map_err(refine_payment_failure)?;
        let receipt: TransferenciaResponse = self.core.parse(response)?;

        self.core.success(TransferReceipt {
            transaction_id: receipt.id,
            status: map_status(&receipt.status),
            amount: self
                .normalize_amount(&receipt.valor)
                .unwrap_or(request.amount),
        })
    }
}
