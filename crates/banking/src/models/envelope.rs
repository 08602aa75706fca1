use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::Institution;
use crate::errors::ProviderError;

/// Generated per-call correlation id.
pub type RequestId = String;

/// The success branch of the result envelope.
///
/// Every public provider operation resolves to `Result<Envelope<T>,
/// ProviderError>`; both branches carry the institution, a generated
/// request id and a UTC timestamp.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope<T> {
    pub institution: Institution,
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(institution: Institution, payload: T) -> Self {
        Self {
            institution,
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Discard the call metadata.
    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            institution: self.institution,
            request_id: self.request_id,
            timestamp: self.timestamp,
            payload: f(self.payload),
        }
    }
}

/// Result of a provider operation: envelope on success, coded failure
/// otherwise.
pub type ProviderResult<T> = Result<Envelope<T>, ProviderError>;
