//! Legacy account-id mapping.
//!
//! The console predates the multi-institution layer and still addresses
//! accounts by these UI-facing ids. The table is configuration data:
//! adding an institution means updating it together with the settings
//! registry.

use crate::models::Institution;

/// Legacy account id -> institution identity.
pub const LEGACY_ACCOUNTS: &[(&str, Institution)] = &[
    ("primary", Institution::Bmp),
    ("mirror", Institution::Bmp531),
    ("crypto-rail", Institution::Foxbit),
];

pub fn institution_for_account(account: &str) -> Option<Institution> {
    LEGACY_ACCOUNTS
        .iter()
        .find(|(id, _)| *id == account)
        .map(|(_, institution)| *institution)
}

pub fn account_for_institution(institution: Institution) -> Option<&'static str> {
    LEGACY_ACCOUNTS
        .iter()
        .find(|(_, mapped)| *mapped == institution)
        .map(|(id, _)| *id)
}
