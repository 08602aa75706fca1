use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Statement query filters recognized by every institution.
///
/// Adapters translate these into their institution's parameter names.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Page size, 1–1000.
    pub limit: Option<u32>,
    /// Opaque pagination token from a previous statement response.
    pub cursor: Option<String>,
}

impl StandardFilters {
    pub const MAX_LIMIT: u32 = 1000;

    /// Validate before any network call.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(format!("date_from {from} is after date_to {to}"));
            }
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > Self::MAX_LIMIT {
                return Err(format!(
                    "limit must be between 1 and {}, got {limit}",
                    Self::MAX_LIMIT
                ));
            }
        }
        Ok(())
    }
}
