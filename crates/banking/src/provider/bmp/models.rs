//! Wire models for the BMP BaaS API.
//!
//! The mirrored 531 ledger speaks the same wire family, so these shapes are
//! shared with the `bmp531` adapter. Amounts are kept as raw JSON values;
//! each adapter converts them through its own `normalize_amount`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaldoResponse {
    pub conta: String,
    pub moeda: Option<String>,
    pub saldo_disponivel: serde_json::Value,
    #[serde(default)]
    pub saldo_bloqueado: serde_json::Value,
    pub atualizado_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtratoResponse {
    pub conta: String,
    pub movimentos: Vec<Movimento>,
    pub proximo_cursor: Option<String>,
    #[serde(default)]
    pub tem_mais: bool,
    pub total: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Movimento {
    pub id: String,
    pub id_externo: Option<String>,
    pub valor: serde_json::Value,
    /// Direction flag: `C` credit, `D` debit.
    pub natureza: String,
    pub status: String,
    pub descricao: Option<String>,
    pub data_hora: DateTime<Utc>,
    pub contraparte: Option<Contraparte>,
    pub pix: Option<PixInfo>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Contraparte {
    pub nome: Option<String>,
    pub documento: Option<String>,
    pub banco: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PixInfo {
    pub chave: Option<String>,
    pub tipo_chave: Option<String>,
    pub end_to_end_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PagamentoPixResponse {
    pub id: String,
    pub end_to_end_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub valor: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChavesPixResponse {
    pub chaves: Vec<ChavePix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChavePix {
    pub chave: String,
    pub tipo: Option<String>,
    pub criada_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QrCodeResponse {
    pub txid: String,
    pub payload: String,
    #[serde(default)]
    pub valor: serde_json::Value,
    pub expira_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferenciaResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub valor: serde_json::Value,
}
