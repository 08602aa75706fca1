//! Per-institution, per-environment settings.
//!
//! Pure lookup/merge logic over a static settings table; no I/O. Settings
//! are resolved once per adapter construction and are immutable afterwards.
//! An institution/environment pair missing from the table is a
//! construction-time error, never a silent fallback.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::models::{Capability, Institution};

/// Backend environment the whole process runs against.
///
/// The application talks to exactly one backend environment per deployment,
/// so this is a single knob on the resolver, not a per-call parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Sandbox,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => f.write_str("production"),
            Environment::Sandbox => f.write_str("sandbox"),
        }
    }
}

/// Institution-supplied secrets.
///
/// Any one complete shape (api key pair, OAuth pair, username/password, or
/// bearer token) marks the adapter as configured. Absence of all shapes is
/// queryable state, not an error.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
}

impl Credentials {
    /// Field-by-field merge: `overrides` wins wherever it has a value.
    pub fn overridden_by(&self, overrides: &Credentials) -> Credentials {
        Credentials {
            api_key: overrides.api_key.clone().or_else(|| self.api_key.clone()),
            api_secret: overrides
                .api_secret
                .clone()
                .or_else(|| self.api_secret.clone()),
            client_id: overrides
                .client_id
                .clone()
                .or_else(|| self.client_id.clone()),
            client_secret: overrides
                .client_secret
                .clone()
                .or_else(|| self.client_secret.clone()),
            username: overrides.username.clone().or_else(|| self.username.clone()),
            password: overrides.password.clone().or_else(|| self.password.clone()),
            bearer_token: overrides
                .bearer_token
                .clone()
                .or_else(|| self.bearer_token.clone()),
        }
    }

    /// True when any recognized credential shape is complete.
    pub fn is_configured(&self) -> bool {
        (self.api_key.is_some() && self.api_secret.is_some())
            || (self.client_id.is_some() && self.client_secret.is_some())
            || (self.username.is_some() && self.password.is_some())
            || self.bearer_token.is_some()
    }
}

/// Rate-limit policy declared by an institution.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitPolicy {
    pub requests_per_minute: u32,
    pub requests_per_hour: Option<u32>,
    /// Burst capacity of the token bucket.
    pub burst: u32,
}

impl RateLimitPolicy {
    /// The per-minute rate after applying the hourly cap, when one exists.
    pub fn effective_per_minute(&self) -> u32 {
        let hourly_cap = self
            .requests_per_hour
            .map(|h| (h / 60).max(1))
            .unwrap_or(u32::MAX);
        self.requests_per_minute.min(hourly_cap).max(1)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: None,
            burst: 10,
        }
    }
}

/// Resolved settings for one institution in one environment.
#[derive(Clone, Debug)]
pub struct InstitutionSettings {
    pub institution: Institution,
    pub environment: Environment,
    pub base_url: String,
    pub timeout: Duration,
    pub capabilities: &'static [Capability],
    pub credentials: Credentials,
    pub rate_limit: RateLimitPolicy,
    /// Transport headers the institution requires on every request.
    pub extra_headers: &'static [(&'static str, &'static str)],
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BMP_CAPABILITIES: &[Capability] = &[
    Capability::Balance,
    Capability::Statement,
    Capability::PixSend,
    Capability::PixKeys,
    Capability::PixQr,
    Capability::Transfer,
];

const BMP531_CAPABILITIES: &[Capability] = &[
    Capability::Balance,
    Capability::Statement,
    Capability::PixSend,
    Capability::PixQr,
];

const FOXBIT_CAPABILITIES: &[Capability] = &[
    Capability::Balance,
    Capability::Statement,
    Capability::PixSend,
    Capability::PixKeys,
    Capability::PixQr,
];

fn builtin_settings(
    institution: Institution,
    environment: Environment,
) -> Result<InstitutionSettings, ConfigError> {
    let settings = match (institution, environment) {
        (Institution::Bmp, Environment::Production) => InstitutionSettings {
            institution,
            environment,
            base_url: "https://api.bmp.money/baas/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
            capabilities: BMP_CAPABILITIES,
            credentials: Credentials::default(),
            rate_limit: RateLimitPolicy {
                requests_per_minute: 240,
                requests_per_hour: Some(10_000),
                burst: 10,
            },
            extra_headers: &[("X-Channel", "pixdesk")],
        },
        (Institution::Bmp, Environment::Sandbox) => InstitutionSettings {
            institution,
            environment,
            base_url: "https://sandbox.bmp.money/baas/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
            capabilities: BMP_CAPABILITIES,
            credentials: Credentials {
                api_key: Some("pixdesk-sandbox".to_string()),
                api_secret: Some("pixdesk-sandbox-secret".to_string()),
                ..Credentials::default()
            },
            rate_limit: RateLimitPolicy {
                requests_per_minute: 60,
                requests_per_hour: None,
                burst: 5,
            },
            extra_headers: &[("X-Channel", "pixdesk")],
        },
        (Institution::Bmp531, Environment::Production) => InstitutionSettings {
            institution,
            environment,
            base_url: "https://api531.bmp.money/baas/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
            capabilities: BMP531_CAPABILITIES,
            credentials: Credentials::default(),
            rate_limit: RateLimitPolicy {
                requests_per_minute: 120,
                requests_per_hour: Some(5_000),
                burst: 5,
            },
            extra_headers: &[("X-Channel", "pixdesk"), ("X-Ledger", "531")],
        },
        (Institution::Bmp531, Environment::Sandbox) => InstitutionSettings {
            institution,
            environment,
            base_url: "https://sandbox531.bmp.money/baas/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
            capabilities: BMP531_CAPABILITIES,
            credentials: Credentials {
                api_key: Some("pixdesk-sandbox".to_string()),
                api_secret: Some("pixdesk-sandbox-secret".to_string()),
                ..Credentials::default()
            },
            rate_limit: RateLimitPolicy {
                requests_per_minute: 60,
                requests_per_hour: None,
                burst: 5,
            },
            extra_headers: &[("X-Channel", "pixdesk"), ("X-Ledger", "531")],
        },
        (Institution::Foxbit, Environment::Production) => InstitutionSettings {
            institution,
            environment,
            base_url: "https://api.foxbit.com.br/rest/v3".to_string(),
            timeout: Duration::from_secs(20),
            capabilities: FOXBIT_CAPABILITIES,
            credentials: Credentials::default(),
            rate_limit: RateLimitPolicy {
                requests_per_minute: 60,
                requests_per_hour: Some(2_000),
                burst: 5,
            },
            extra_headers: &[],
        },
        // Foxbit exposes no sandbox; reserved identities have no entries.
        (Institution::Foxbit, environment) => {
            return Err(ConfigError::UnknownEnvironment {
                institution,
                environment,
            })
        }
        (Institution::Celcoin | Institution::Qitech, _) => {
            return Err(ConfigError::UnknownInstitution(institution))
        }
    };
    Ok(settings)
}

/// Settings lookup for the whole process.
///
/// Holds the current environment knob; constructed once and shared by
/// reference (no global state).
pub struct ConfigResolver {
    environment: RwLock<Environment>,
}

impl ConfigResolver {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment: RwLock::new(environment),
        }
    }

    fn read_environment(&self) -> RwLockReadGuard<'_, Environment> {
        self.environment
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_environment(&self) -> RwLockWriteGuard<'_, Environment> {
        self.environment
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn environment(&self) -> Environment {
        *self.read_environment()
    }

    pub fn set_environment(&self, environment: Environment) {
        *self.write_environment() = environment;
    }

    /// Resolve settings for an institution in the current environment,
    /// merging caller-supplied credentials over the defaults.
    pub fn resolve(
        &self,
        institution: Institution,
        overrides: Option<&Credentials>,
    ) -> Result<InstitutionSettings, ConfigError> {
        let mut settings = builtin_settings(institution, self.environment())?;
        if let Some(overrides) = overrides {
            settings.credentials = settings.credentials.overridden_by(overrides);
        }
        Ok(settings)
    }

    /// All identities with a settings entry in any environment.
    pub fn known_institutions(&self) -> Vec<Institution> {
        Institution::ALL
            .iter()
            .copied()
            .filter(|&institution| {
                builtin_settings(institution, Environment::Production).is_ok()
                    || builtin_settings(institution, Environment::Sandbox).is_ok()
            })
            .collect()
    }

    /// Identities declaring a capability in the current environment.
    pub fn institutions_with(&self, capability: Capability) -> Vec<Institution> {
        let environment = self.environment();
        Institution::ALL
            .iter()
            .copied()
            .filter(|&institution| {
                builtin_settings(institution, environment)
                    .map(|s| s.capabilities.contains(&capability))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(Environment::Production)
    }
}
