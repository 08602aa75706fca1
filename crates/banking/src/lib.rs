//! PixDesk Banking Crate
//!
//! This crate provides the institution-agnostic banking layer for the
//! PixDesk operations console.
//!
//! # Overview
//!
//! The banking crate supports:
//! - Multiple institutions: the BMP settlement bank, its mirrored 531
//!   ledger, and the Foxbit PIX rail
//! - A single provider contract for balance, statement, transaction and
//!   PIX operations
//! - Capability negotiation per institution
//! - Fan-out querying across every registered institution
//! - A uniform result envelope with a closed error taxonomy
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  BankingService  | --> | ProviderRegistry |  (active + fan-out routing)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | BankingProvider  |  (BMP, BMP-531, Foxbit)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  Standard Model  |  (Balance, Statement, ...)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Institution`] - Identity of a banking backend
//! - [`BankingProvider`] - The contract every institution adapter implements
//! - [`ProviderRegistry`] - Registered adapters, the active one, fan-out
//! - [`BankingService`] - The entry point the console calls
//! - [`Envelope`] / [`ProviderError`] - The uniform result envelope

pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;
pub mod token;

// Re-export all public types from models
pub use models::{
    Balance, Capability, Counterparty, Envelope, HealthReport, Institution, PixChargeRequest,
    PixDetails, PixKeyInfo, PixKeyType, PixPayment, PixQrCode, ProviderResult, RequestId,
    StandardFilters, Statement, StatementSummary, Transaction, TransactionStatus, TransactionType,
    TransferReceipt, TransferRequest,
};

// Re-export configuration types
pub use config::{ConfigResolver, Credentials, Environment, InstitutionSettings, RateLimitPolicy};

// Re-export error types
pub use errors::{ConfigError, ErrorCode, ProviderError};

// Re-export provider types
pub use provider::bmp::BmpProvider;
pub use provider::bmp531::Bmp531Provider;
pub use provider::foxbit::FoxbitProvider;
pub use provider::{BankingProvider, ProviderCore, RequestPacer};

// Re-export registry and service types
pub use registry::{FanOutOutcome, ProviderRegistry};
pub use service::{AccountOutcome, BankingService, ServiceError, LEGACY_ACCOUNTS};
pub use token::{MemoryTokenStore, TokenStore};
