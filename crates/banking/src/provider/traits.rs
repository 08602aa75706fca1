//! The provider contract every institution adapter implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::ProviderError;
use crate::models::{
    Balance, Capability, Envelope, HealthReport, Institution, PixChargeRequest, PixKeyInfo,
    PixPayment, PixQrCode, ProviderResult, StandardFilters, Statement, Transaction,
    TransferReceipt, TransferRequest,
};

/// Contract between the registry and an institution's adapter.
///
/// Four operations are mandatory: `health_check` (provided, timed over the
/// cheapest read), `get_balance`, `get_statement` and `get_transaction`.
/// Optional operations ship default bodies returning `NOT_SUPPORTED`, so an
/// adapter only implements what its capability set declares; there are no
/// runtime method-existence checks.
#[async_trait]
pub trait BankingProvider: Send + Sync {
    /// The identity this adapter serves.
    fn institution(&self) -> Institution;

    /// Declared feature set, from the resolved settings.
    fn capabilities(&self) -> &'static [Capability];

    /// Whether any recognized credential shape is present.
    ///
    /// Used for UI gating only; an unconfigured adapter still attempts
    /// calls and surfaces the transport failure.
    fn is_configured(&self) -> bool;

    /// Pure set-membership check against the declared capability set.
    fn has_feature(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Cheapest available read, timed.
    ///
    /// Failures come back through the standard taxonomy, never as a panic
    /// or raw transport error.
    async fn health_check(&self) -> ProviderResult<HealthReport> {
        let started = std::time::Instant::now();
        self.get_balance().await?;
        Ok(Envelope::new(
            self.institution(),
            HealthReport::up(started.elapsed()),
        ))
    }

    async fn get_balance(&self) -> ProviderResult<Balance>;

    async fn get_statement(&self, filters: &StandardFilters) -> ProviderResult<Statement>;

    async fn get_transaction(&self, transaction_id: &str) -> ProviderResult<Transaction>;

    async fn send_pix(&self, charge: &PixChargeRequest) -> ProviderResult<PixPayment> {
        let _ = charge;
        Err(ProviderError::unsupported(self.institution(), "send_pix"))
    }

    async fn get_pix_keys(&self) -> ProviderResult<Vec<PixKeyInfo>> {
        Err(ProviderError::unsupported(
            self.institution(),
            "get_pix_keys",
        ))
    }

    async fn generate_pix_qr(
        &self,
        amount: Decimal,
        description: Option<&str>,
    ) -> ProviderResult<PixQrCode> {
        let _ = (amount, description);
        Err(ProviderError::unsupported(
            self.institution(),
            "generate_pix_qr",
        ))
    }

    async fn transfer(&self, request: &TransferRequest) -> ProviderResult<TransferReceipt> {
        let _ = request;
        Err(ProviderError::unsupported(self.institution(), "transfer"))
    }

    /// Convert a raw wire amount into decimal currency units.
    ///
    /// The base behavior assumes the wire already carries decimal units;
    /// institutions with minor-unit formats override this.
    fn normalize_amount(&self, raw: &serde_json::Value) -> Option<Decimal> {
        crate::models::decimal_from_value(raw)
    }

    /// Render a timestamp the way the institution's API expects.
    fn format_date(&self, timestamp: DateTime<Utc>) -> String {
        timestamp.to_rfc3339()
    }
}
