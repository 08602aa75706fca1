//! The banking facade the console calls.
//!
//! `BankingService` is the single entry point of the provider layer: it
//! guarantees one-time initialization, resolves legacy account ids, gates
//! every operation on the active institution's capability set, and unwraps
//! the result envelope into errors that carry the institution and the
//! attempted operation.

mod accounts;

pub use accounts::LEGACY_ACCOUNTS;

use std::sync::Arc;

use log::{error, info, warn};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::OnceCell;

use accounts::{account_for_institution, institution_for_account};

use crate::errors::ProviderError;
use crate::models::{
    Balance, Capability, Envelope, HealthReport, Institution, PixChargeRequest, PixKeyInfo,
    PixPayment, PixQrCode, StandardFilters, Statement, Transaction, TransferReceipt,
    TransferRequest,
};
use crate::provider::BankingProvider;
use crate::registry::{FanOutOutcome, ProviderRegistry};

/// The institution default-routed operations start on when nothing else
/// was activated.
const DEFAULT_ACTIVE: Institution = Institution::Bmp;

/// Failures surfaced to the console.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("banking service is not initialized")]
    NotInitialized,

    #[error("no active institution")]
    NoActiveInstitution,

    #[error("{operation} failed on {institution}: {source}")]
    Operation {
        institution: Institution,
        operation: String,
        #[source]
        source: ProviderError,
    },
}

/// One per-account entry of a fleet operation.
pub struct AccountOutcome<T> {
    pub account: &'static str,
    pub institution: Institution,
    pub result: Result<T, ProviderError>,
}

pub struct BankingService {
    registry: Arc<ProviderRegistry>,
    init: OnceCell<()>,
}

impl BankingService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            init: OnceCell::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Lazy, single-flight initialization.
    ///
    /// Concurrent first callers share one registration pass; later calls
    /// are no-ops. Registration failures for individual institutions are
    /// logged and surfaced through `health_check_all`, not fatal here.
    pub async fn initialize(&self) {
        self.init
            .get_or_init(|| async {
                info!("initializing banking service");
                for (institution, error) in self.registry.auto_register_defaults() {
                    warn!("default registration of {institution} skipped: {error}");
                }
                if self.registry.active_institution().is_none() {
                    self.registry.set_active(DEFAULT_ACTIVE);
                }
            })
            .await;
    }

    fn active_adapter(&self) -> Result<Arc<dyn BankingProvider>, ServiceError> {
        self.registry
            .active()
            .ok_or(ServiceError::NoActiveInstitution)
    }

    /// Reject operations outside the active capability set before any
    /// network call is made.
    fn require_feature(
        adapter: &Arc<dyn BankingProvider>,
        capability: Capability,
        operation: &str,
    ) -> Result<(), ServiceError> {
        if adapter.has_feature(capability) {
            return Ok(());
        }
        let institution = adapter.institution();
        Err(ServiceError::Operation {
            institution,
            operation: operation.to_string(),
            source: ProviderError::unsupported(institution, operation),
        })
    }

    fn operation_error(operation: impl Into<String>, source: ProviderError) -> ServiceError {
        let operation = operation.into();
        if source.code.is_transient() {
            warn!("{operation} failed on {}: {source}", source.institution);
        } else {
            error!("{operation} failed on {}: {source}", source.institution);
        }
        ServiceError::Operation {
            institution: source.institution,
            operation,
            source,
        }
    }

    /// Legacy account ids whose institution is currently registered.
    pub async fn available_accounts(&self) -> Vec<&'static str> {
        self.initialize().await;
        LEGACY_ACCOUNTS
            .iter()
            .filter(|(_, institution)| self.registry.is_registered(*institution))
            .map(|(account, _)| *account)
            .collect()
    }

    /// Route default operations to the institution behind a legacy
    /// account id. False for unknown ids and unregistered institutions.
    pub async fn set_active_account(&self, account: &str) -> bool {
        self.initialize().await;
        match institution_for_account(account) {
            Some(institution) => self.registry.set_active(institution),
            None => {
                warn!("unknown legacy account id: {account}");
                false
            }
        }
    }

    pub async fn get_active_account(&self) -> Option<&'static str> {
        self.initialize().await;
        self.registry
            .active_institution()
            .and_then(account_for_institution)
    }

    pub async fn get_balance(&self) -> Result<Balance, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::Balance, "get_balance")?;
        adapter
            .get_balance()
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error("get_balance", e))
    }

    pub async fn get_statement(
        &self,
        filters: Option<StandardFilters>,
    ) -> Result<Statement, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::Statement, "get_statement")?;
        let filters = filters.unwrap_or_default();
        adapter
            .get_statement(&filters)
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error("get_statement", e))
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::Statement, "get_transaction")?;
        adapter
            .get_transaction(transaction_id)
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error(format!("get_transaction id={transaction_id}"), e))
    }

    /// Send a PIX payment through the active institution.
    ///
    /// Unlike every other wrapper this never triggers initialization: an
    /// in-flight payment must not overlap a registration pass. Callers
    /// initialize first or get `NotInitialized`.
    pub async fn send_pix(&self, charge: PixChargeRequest) -> Result<PixPayment, ServiceError> {
        if !self.init.initialized() {
            return Err(ServiceError::NotInitialized);
        }
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::PixSend, "send_pix")?;
        let context = format!("send_pix amount={} key={}", charge.amount, charge.key);
        adapter
            .send_pix(&charge)
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error(context, e))
    }

    pub async fn get_pix_keys(&self) -> Result<Vec<PixKeyInfo>, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::PixKeys, "get_pix_keys")?;
        adapter
            .get_pix_keys()
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error("get_pix_keys", e))
    }

    pub async fn generate_pix_qr(
        &self,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<PixQrCode, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::PixQr, "generate_pix_qr")?;
        adapter
            .generate_pix_qr(amount, description)
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error(format!("generate_pix_qr amount={amount}"), e))
    }

    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, ServiceError> {
        self.initialize().await;
        let adapter = self.active_adapter()?;
        Self::require_feature(&adapter, Capability::Transfer, "transfer")?;
        let context = format!("transfer amount={}", request.amount);
        adapter
            .transfer(&request)
            .await
            .map(Envelope::into_payload)
            .map_err(|e| Self::operation_error(context, e))
    }

    pub async fn health_check_all(&self) -> Vec<FanOutOutcome<HealthReport>> {
        self.initialize().await;
        self.registry.health_check_all().await
    }

    /// Balance across every registered institution with a legacy account
    /// mapping; unmapped institutions are filtered out.
    pub async fn get_balance_from_all_accounts(&self) -> Vec<AccountOutcome<Balance>> {
        self.initialize().await;
        let institutions = self.registry.registered();
        let outcomes = self
            .registry
            .execute_on_many(&institutions, |adapter| async move {
                adapter.get_balance().await
            })
            .await;
        Self::into_account_outcomes(outcomes)
    }

    /// Statement across every registered institution with a legacy account
    /// mapping; unmapped institutions are filtered out.
    pub async fn get_statement_from_all_accounts(
        &self,
        filters: Option<StandardFilters>,
    ) -> Vec<AccountOutcome<Statement>> {
        self.initialize().await;
        let filters = filters.unwrap_or_default();
        let institutions = self.registry.registered();
        let outcomes = self
            .registry
            .execute_on_many(&institutions, |adapter| {
                let filters = filters.clone();
                async move { adapter.get_statement(&filters).await }
            })
            .await;
        Self::into_account_outcomes(outcomes)
    }

    fn into_account_outcomes<T>(outcomes: Vec<FanOutOutcome<T>>) -> Vec<AccountOutcome<T>> {
        outcomes
            .into_iter()
            .filter_map(|outcome| {
                account_for_institution(outcome.institution).map(|account| AccountOutcome {
                    account,
                    institution: outcome.institution,
                    result: outcome.result.map(Envelope::into_payload),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigResolver, Environment};
    use crate::errors::ErrorCode;
    use crate::models::ProviderResult;
    use crate::token::MemoryTokenStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        institution: Institution,
        capabilities: &'static [Capability],
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl BankingProvider for MockProvider {
        fn institution(&self) -> Institution {
            self.institution
        }

        fn capabilities(&self) -> &'static [Capability] {
            self.capabilities
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn get_balance(&self) -> ProviderResult<Balance> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::new(
                self.institution,
                Balance::new(
                    self.institution,
                    "mock".to_string(),
                    "BRL".to_string(),
                    dec!(10),
                    dec!(0),
                    Utc::now(),
                    serde_json::Value::Null,
                ),
            ))
        }

        async fn get_statement(&self, _filters: &StandardFilters) -> ProviderResult<Statement> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::new(
                self.institution,
                Statement::assemble(
                    self.institution,
                    "mock".to_string(),
                    Vec::new(),
                    None,
                    false,
                    Some(0),
                ),
            ))
        }

        async fn get_transaction(&self, _transaction_id: &str) -> ProviderResult<Transaction> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(
                self.institution,
                ErrorCode::NotFound,
                "mock",
            ))
        }

        async fn send_pix(&self, _charge: &PixChargeRequest) -> ProviderResult<PixPayment> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(
                self.institution,
                ErrorCode::NotImplemented,
                "mock",
            ))
        }
    }

    fn service(environment: Environment) -> BankingService {
        let registry = Arc::new(ProviderRegistry::new(
            Arc::new(ConfigResolver::new(environment)),
            Arc::new(MemoryTokenStore::new()),
        ));
        BankingService::new(registry)
    }

    #[tokio::test]
    async fn test_initialize_registers_defaults_and_activates_primary() {
        let service = service(Environment::Production);
        service.initialize().await;

        assert_eq!(
            service.available_accounts().await,
            vec!["primary", "mirror", "crypto-rail"]
        );
        assert_eq!(service.get_active_account().await, Some("primary"));
    }

    #[tokio::test]
    async fn test_concurrent_initialization_is_single_flight() {
        let service = service(Environment::Production);
        tokio::join!(service.initialize(), service.initialize());
        assert_eq!(service.available_accounts().await.len(), 3);
        assert_eq!(service.get_active_account().await, Some("primary"));
    }

    #[tokio::test]
    async fn test_reinitialization_keeps_selected_account() {
        let service = service(Environment::Production);
        service.initialize().await;
        assert!(service.set_active_account("mirror").await);

        // later calls re-enter the guard without re-running registration
        service.initialize().await;
        assert_eq!(service.get_active_account().await, Some("mirror"));
    }

    #[tokio::test]
    async fn test_set_active_account_resolution() {
        let service = service(Environment::Production);
        assert!(service.set_active_account("crypto-rail").await);
        assert_eq!(service.get_active_account().await, Some("crypto-rail"));

        assert!(!service.set_active_account("checking").await);
        assert_eq!(service.get_active_account().await, Some("crypto-rail"));
    }

    #[tokio::test]
    async fn test_sandbox_hides_unresolvable_accounts() {
        let service = service(Environment::Sandbox);
        // Foxbit has no sandbox settings, so its account never shows up
        assert_eq!(
            service.available_accounts().await,
            vec!["primary", "mirror"]
        );
        assert!(!service.set_active_account("crypto-rail").await);
    }

    #[tokio::test]
    async fn test_send_pix_does_not_initialize() {
        let service = service(Environment::Production);
        let result = service
            .send_pix(PixChargeRequest {
                key: "user@example.com".to_string(),
                amount: dec!(10),
                description: None,
                key_type: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::NotInitialized)));
        // the guard really did not run
        assert!(service.registry.registered().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_capability_rejected_without_a_call() {
        let service = service(Environment::Production);
        service.initialize().await;

        let mock = Arc::new(MockProvider {
            institution: Institution::Foxbit,
            capabilities: &[Capability::Balance],
            call_count: AtomicUsize::new(0),
        });
        service.registry.register(mock.clone());
        assert!(service.set_active_account("crypto-rail").await);

        let result = service
            .send_pix(PixChargeRequest {
                key: "user@example.com".to_string(),
                amount: dec!(10),
                description: None,
                key_type: None,
            })
            .await;

        match result {
            Err(ServiceError::Operation {
                institution,
                source,
                ..
            }) => {
                assert_eq!(institution, Institution::Foxbit);
                assert_eq!(source.code, ErrorCode::NotSupported);
            }
            other => panic!("expected a NOT_SUPPORTED operation error, got {other:?}"),
        }
        // the adapter was never invoked
        assert_eq!(mock.call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transfer_gated_on_mirror() {
        let service = service(Environment::Production);
        service.initialize().await;
        assert!(service.set_active_account("mirror").await);

        let result = service
            .transfer(TransferRequest {
                destination_account: "98765-4".to_string(),
                destination_document: None,
                amount: dec!(5),
                description: None,
            })
            .await;

        match result {
            Err(ServiceError::Operation { source, .. }) => {
                assert_eq!(source.code, ErrorCode::NotSupported);
            }
            other => panic!("expected a NOT_SUPPORTED operation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_operation_error_carries_context() {
        let service = service(Environment::Production);
        service.initialize().await;

        let mock = Arc::new(MockProvider {
            institution: Institution::Foxbit,
            capabilities: &[Capability::Statement],
            call_count: AtomicUsize::new(0),
        });
        service.registry.register(mock);
        assert!(service.set_active_account("crypto-rail").await);

        let error = service.get_transaction("tx-1").await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("get_transaction id=tx-1"));
        assert!(message.contains("FOXBIT"));
    }

    #[tokio::test]
    async fn test_fleet_balance_uses_legacy_account_ids() {
        let service = service(Environment::Production);
        service.initialize().await;

        // replace all three with mocks so no network is touched
        for institution in [Institution::Bmp, Institution::Bmp531, Institution::Foxbit] {
            service.registry.register(Arc::new(MockProvider {
                institution,
                capabilities: &[Capability::Balance],
                call_count: AtomicUsize::new(0),
            }));
        }

        let outcomes = service.get_balance_from_all_accounts().await;
        assert_eq!(outcomes.len(), 3);
        let accounts: Vec<_> = outcomes.iter().map(|o| o.account).collect();
        assert_eq!(accounts, vec!["primary", "mirror", "crypto-rail"]);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }
}
