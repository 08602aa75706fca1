//! Registry of institution adapters.
//!
//! The registry holds every registered adapter, the single active one, and
//! the fan-out machinery. It is an explicitly constructed object shared by
//! `Arc`, not a process-wide singleton; the console builds one registry and
//! hands it to the service layer.
//!
//! Per identity the lifecycle is `Unregistered -> Registered -> Active ->
//! Registered -> Unregistered`, with at most one identity active at a time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use log::{debug, info, warn};

use crate::config::{ConfigResolver, Credentials};
use crate::errors::{ConfigError, ProviderError};
use crate::models::{Capability, HealthReport, Institution, ProviderResult};
use crate::provider::bmp::BmpProvider;
use crate::provider::bmp531::Bmp531Provider;
use crate::provider::foxbit::FoxbitProvider;
use crate::provider::BankingProvider;
use crate::token::TokenStore;

type AdapterMap = HashMap<Institution, Arc<dyn BankingProvider>>;

/// One entry of a fan-out result list.
///
/// Entries follow the input identity order, not completion order; absent
/// identities appear as synthetic failures instead of being omitted.
pub struct FanOutOutcome<T> {
    pub institution: Institution,
    pub result: ProviderResult<T>,
}

pub struct ProviderRegistry {
    adapters: RwLock<AdapterMap>,
    active: RwLock<Option<Institution>>,
    config: Arc<ConfigResolver>,
    tokens: Arc<dyn TokenStore>,
}

impl ProviderRegistry {
    pub fn new(config: Arc<ConfigResolver>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            config,
            tokens,
        }
    }

    /// Lock recovery: a registry read beats a panic if a writer died.
    fn read_adapters(&self) -> RwLockReadGuard<'_, AdapterMap> {
        self.adapters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_adapters(&self) -> RwLockWriteGuard<'_, AdapterMap> {
        self.adapters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_active(&self) -> RwLockReadGuard<'_, Option<Institution>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, Option<Institution>> {
        self.active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an adapter, replacing any previous one for the identity.
    pub fn register(&self, adapter: Arc<dyn BankingProvider>) {
        let institution = adapter.institution();
        debug!("registering adapter for {institution}");
        self.write_adapters().insert(institution, adapter);
    }

    /// Factory-construct and register the adapter for an identity.
    ///
    /// Settings come from the configuration resolver in its current
    /// environment; caller credentials are merged over the defaults.
    pub fn register_institution(
        &self,
        institution: Institution,
        credentials: Option<&Credentials>,
    ) -> Result<(), ConfigError> {
        let settings = self.config.resolve(institution, credentials)?;
        let adapter: Arc<dyn BankingProvider> = match institution {
            Institution::Bmp => Arc::new(BmpProvider::new(settings, self.tokens.clone())),
            Institution::Bmp531 => Arc::new(Bmp531Provider::new(settings, self.tokens.clone())),
            Institution::Foxbit => Arc::new(FoxbitProvider::new(settings, self.tokens.clone())),
            other => return Err(ConfigError::UnknownInstitution(other)),
        };
        self.register(adapter);
        Ok(())
    }

    /// Remove an identity's adapter; clears the active pointer if it was
    /// the active one.
    pub fn unregister(&self, institution: Institution) {
        self.write_adapters().remove(&institution);
        let mut active = self.write_active();
        if *active == Some(institution) {
            info!("unregistered the active institution {institution}, active is now none");
            *active = None;
        }
    }

    /// Make a registered identity the active one.
    ///
    /// Returns false (leaving the current active untouched) when the
    /// identity is not registered.
    pub fn set_active(&self, institution: Institution) -> bool {
        if !self.read_adapters().contains_key(&institution) {
            warn!("cannot activate {institution}: not registered");
            return false;
        }
        *self.write_active() = Some(institution);
        true
    }

    pub fn active_institution(&self) -> Option<Institution> {
        *self.read_active()
    }

    pub fn active(&self) -> Option<Arc<dyn BankingProvider>> {
        let institution = self.active_institution()?;
        self.get(institution)
    }

    pub fn get(&self, institution: Institution) -> Option<Arc<dyn BankingProvider>> {
        self.read_adapters().get(&institution).cloned()
    }

    pub fn is_registered(&self, institution: Institution) -> bool {
        self.read_adapters().contains_key(&institution)
    }

    /// Registered identities in stable order.
    pub fn registered(&self) -> Vec<Institution> {
        let mut institutions: Vec<_> = self.read_adapters().keys().copied().collect();
        institutions.sort();
        institutions
    }

    /// Registered adapters declaring a capability, in stable order.
    pub fn by_capability(&self, capability: Capability) -> Vec<Arc<dyn BankingProvider>> {
        let mut adapters: Vec<_> = self
            .read_adapters()
            .values()
            .filter(|adapter| adapter.has_feature(capability))
            .cloned()
            .collect();
        adapters.sort_by_key(|adapter| adapter.institution());
        adapters
    }

    /// Run one operation against many identities with all-settled
    /// semantics.
    ///
    /// Calls are issued concurrently; one adapter's failure never aborts
    /// the others, and the result list follows the input identity order.
    pub async fn execute_on_many<T, F, Fut>(
        &self,
        institutions: &[Institution],
        operation: F,
    ) -> Vec<FanOutOutcome<T>>
    where
        F: Fn(Arc<dyn BankingProvider>) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let adapters: Vec<(Institution, Option<Arc<dyn BankingProvider>>)> = {
            let map = self.read_adapters();
            institutions
                .iter()
                .map(|&institution| (institution, map.get(&institution).cloned()))
                .collect()
        };

        let tasks = adapters.into_iter().map(|(institution, adapter)| {
            let operation = &operation;
            async move {
                match adapter {
                    Some(adapter) => FanOutOutcome {
                        institution,
                        result: operation(adapter).await,
                    },
                    None => FanOutOutcome {
                        institution,
                        result: Err(ProviderError::not_registered(institution)),
                    },
                }
            }
        });

        join_all(tasks).await
    }

    /// Health-check every registered adapter.
    pub async fn health_check_all(&self) -> Vec<FanOutOutcome<HealthReport>> {
        let institutions = self.registered();
        self.execute_on_many(&institutions, |adapter| async move {
            adapter.health_check().await
        })
        .await
    }

    /// Register the standard institution set with default credentials.
    ///
    /// Re-registration replaces adapters but must never silently change
    /// routing: whichever identity was active before the call is active
    /// after it. Identities that fail to resolve (e.g. no settings in the
    /// current environment) are reported, not fatal.
    pub fn auto_register_defaults(&self) -> Vec<(Institution, ConfigError)> {
        let previously_active = self.active_institution();
        let mut failures = Vec::new();

        for &institution in Institution::DEFAULTS {
            if let Err(error) = self.register_institution(institution, None) {
                warn!("skipping default registration of {institution}: {error}");
                failures.push((institution, error));
            }
        }

        if let Some(active) = previously_active {
            self.set_active(active);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::errors::ErrorCode;
    use crate::models::{Balance, StandardFilters, Statement, Transaction};
    use crate::token::MemoryTokenStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        institution: Institution,
        capabilities: &'static [Capability],
        should_fail: bool,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(institution: Institution, should_fail: bool) -> Self {
            Self {
                institution,
                capabilities: &[Capability::Balance, Capability::Statement],
                should_fail,
                call_count: AtomicUsize::new(0),
            }
        }
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
            if self.should_fail {
                return Err(ProviderError::new(
                    self.institution,
                    ErrorCode::ConnectionError,
                    "mock failure",
                ));
            }
            Ok(crate::models::Envelope::new(
                self.institution,
                Balance::new(
                    self.institution,
                    "mock".to_string(),
                    "BRL".to_string(),
                    dec!(100),
                    dec!(0),
                    Utc::now(),
                    serde_json::Value::Null,
                ),
            ))
        }

        async fn get_statement(&self, _filters: &StandardFilters) -> ProviderResult<Statement> {
            Err(ProviderError::new(
                self.institution,
                ErrorCode::NotImplemented,
                "mock",
            ))
        }

        async fn get_transaction(&self, _transaction_id: &str) -> ProviderResult<Transaction> {
            Err(ProviderError::new(
                self.institution,
                ErrorCode::NotImplemented,
                "mock",
            ))
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(
            Arc::new(ConfigResolver::new(Environment::Production)),
            Arc::new(MemoryTokenStore::new()),
        )
    }

    #[test]
    fn test_at_most_one_active() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.register(Arc::new(MockProvider::new(Institution::Foxbit, false)));

        assert!(registry.set_active(Institution::Bmp));
        assert_eq!(registry.active_institution(), Some(Institution::Bmp));

        // activating another identity demotes the previous one
        assert!(registry.set_active(Institution::Foxbit));
        assert_eq!(registry.active_institution(), Some(Institution::Foxbit));
    }

    #[test]
    fn test_set_active_unregistered_fails_and_keeps_current() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.set_active(Institution::Bmp);

        assert!(!registry.set_active(Institution::Foxbit));
        assert_eq!(registry.active_institution(), Some(Institution::Bmp));
    }

    #[test]
    fn test_unregister_active_clears_pointer() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.set_active(Institution::Bmp);

        registry.unregister(Institution::Bmp);
        assert_eq!(registry.active_institution(), None);
        assert!(!registry.is_registered(Institution::Bmp));
    }

    #[test]
    fn test_unregister_other_keeps_active() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.register(Arc::new(MockProvider::new(Institution::Foxbit, false)));
        registry.set_active(Institution::Bmp);

        registry.unregister(Institution::Foxbit);
        assert_eq!(registry.active_institution(), Some(Institution::Bmp));
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, true)));
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        assert_eq!(registry.registered(), vec![Institution::Bmp]);
    }

    #[test]
    fn test_by_capability_filters() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.register(Arc::new(MockProvider {
            institution: Institution::Foxbit,
            capabilities: &[Capability::Balance, Capability::PixSend],
            should_fail: false,
            call_count: AtomicUsize::new(0),
        }));

        let with_pix = registry.by_capability(Capability::PixSend);
        assert_eq!(with_pix.len(), 1);
        assert_eq!(with_pix[0].institution(), Institution::Foxbit);

        assert_eq!(registry.by_capability(Capability::Balance).len(), 2);
        assert!(registry.by_capability(Capability::Boleto).is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_is_all_settled() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.register(Arc::new(MockProvider::new(Institution::Bmp531, true)));
        registry.register(Arc::new(MockProvider::new(Institution::Foxbit, false)));

        let outcomes = registry
            .execute_on_many(
                &[Institution::Bmp, Institution::Bmp531, Institution::Foxbit],
                |adapter| async move { adapter.get_balance().await },
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap_err().code,
            ErrorCode::ConnectionError
        );
        assert!(outcomes[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_fan_out_reports_absent_identities() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));

        let outcomes = registry
            .execute_on_many(&[Institution::Bmp, Institution::Foxbit], |adapter| async move {
                adapter.get_balance().await
            })
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        let error = outcomes[1].result.as_ref().unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidParameters);
        assert_eq!(error.institution, Institution::Foxbit);
    }

    #[tokio::test]
    async fn test_fan_out_follows_input_order() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::new(Institution::Bmp, false)));
        registry.register(Arc::new(MockProvider::new(Institution::Foxbit, false)));

        let outcomes = registry
            .execute_on_many(&[Institution::Foxbit, Institution::Bmp], |adapter| async move {
                adapter.get_balance().await
            })
            .await;

        assert_eq!(outcomes[0].institution, Institution::Foxbit);
        assert_eq!(outcomes[1].institution, Institution::Bmp);
    }

    #[test]
    fn test_auto_register_defaults_preserves_active() {
        let registry = registry();
        let failures = registry.auto_register_defaults();
        assert!(failures.is_empty());
        assert!(registry.set_active(Institution::Foxbit));

        let failures = registry.auto_register_defaults();
        assert!(failures.is_empty());
        assert_eq!(registry.active_institution(), Some(Institution::Foxbit));
    }

    #[test]
    fn test_auto_register_reports_unresolvable_environments() {
        let registry = ProviderRegistry::new(
            Arc::new(ConfigResolver::new(Environment::Sandbox)),
            Arc::new(MemoryTokenStore::new()),
        );
        let failures = registry.auto_register_defaults();
        // Foxbit has no sandbox environment
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Institution::Foxbit);
        assert!(registry.is_registered(Institution::Bmp));
        assert!(registry.is_registered(Institution::Bmp531));
    }

    #[test]
    fn test_register_reserved_institution_fails() {
        let registry = registry();
        assert_eq!(
            registry.register_institution(Institution::Celcoin, None),
            Err(ConfigError::UnknownInstitution(Institution::Celcoin))
        );
    }
}
