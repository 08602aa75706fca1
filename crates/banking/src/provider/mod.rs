//! Institution adapters and the shared behavior they are built on.
//!
//! One sub-module per institution. Every adapter owns the translation
//! between its institution's wire format and the standard model; everything
//! transport-shaped lives in [`ProviderCore`].

pub mod bmp;
pub mod bmp531;
pub mod core;
pub mod foxbit;
pub mod pacing;
pub mod traits;

pub use self::core::ProviderCore;
pub use pacing::RequestPacer;
pub use traits::BankingProvider;
