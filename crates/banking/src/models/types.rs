use serde::{Deserialize, Serialize};

/// Identity of a banking institution addressed through this layer.
///
/// Used as the map key everywhere. `Celcoin` and `Qitech` are reserved
/// identities: they have no settings entry and no adapter yet, so resolving
/// them fails at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Institution {
    /// The BMP settlement bank.
    #[serde(rename = "BMP")]
    Bmp,
    /// The mirrored 531 ledger of the same bank.
    #[serde(rename = "BMP_531")]
    Bmp531,
    /// The Foxbit-operated PIX rail.
    #[serde(rename = "FOXBIT")]
    Foxbit,
    /// Reserved, not implemented.
    #[serde(rename = "CELCOIN")]
    Celcoin,
    /// Reserved, not implemented.
    #[serde(rename = "QITECH")]
    Qitech,
}

impl Institution {
    /// The institutions registered by `auto_register_defaults`.
    pub const DEFAULTS: &'static [Institution] =
        &[Institution::Bmp, Institution::Bmp531, Institution::Foxbit];

    /// Every declared identity, reserved ones included.
    pub const ALL: &'static [Institution] = &[
        Institution::Bmp,
        Institution::Bmp531,
        Institution::Foxbit,
        Institution::Celcoin,
        Institution::Qitech,
    ];

    /// Stable uppercase id used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Institution::Bmp => "BMP",
            Institution::Bmp531 => "BMP_531",
            Institution::Foxbit => "FOXBIT",
            Institution::Celcoin => "CELCOIN",
            Institution::Qitech => "QITECH",
        }
    }
}

impl std::fmt::Display for Institution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named operation an institution's adapter can declare support for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Balance,
    Statement,
    PixSend,
    PixReceive,
    PixKeys,
    PixQr,
    Transfer,
    Boleto,
    Webhooks,
}

/// Outcome of a provider health check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub latency_ms: u64,
}

impl HealthReport {
    pub fn up(latency: std::time::Duration) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms: latency.as_millis() as u64,
        }
    }
}
