use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::TransactionStatus;
use crate::errors::ErrorCode;

/// PIX key classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    /// Random key.
    Evp,
}

impl PixKeyType {
    /// Infer the key type from the key's shape.
    ///
    /// The rules are ordered and first-match-wins; reordering them changes
    /// the classification of ambiguous inputs, so the order is a contract.
    pub fn infer(key: &str) -> PixKeyType {
        let key = key.trim();
        if key.contains('@') && key.contains('.') {
            return PixKeyType::Email;
        }
        if key.starts_with('+') {
            return PixKeyType::Phone;
        }
        let digits_only = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
        if digits_only && key.len() == 11 {
            return PixKeyType::Cpf;
        }
        if digits_only && key.len() == 14 {
            return PixKeyType::Cnpj;
        }
        if key.len() == 32
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return PixKeyType::Evp;
        }
        if digits_only && (10..=13).contains(&key.len()) {
            return PixKeyType::Phone;
        }
        PixKeyType::Evp
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixKeyType::Cpf => "CPF",
            PixKeyType::Cnpj => "CNPJ",
            PixKeyType::Email => "EMAIL",
            PixKeyType::Phone => "PHONE",
            PixKeyType::Evp => "EVP",
        }
    }
}

/// An outgoing PIX payment request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PixChargeRequest {
    pub key: String,
    pub amount: Decimal,
    pub description: Option<String>,
    /// Explicit key type; inferred from the key's shape when absent.
    pub key_type: Option<PixKeyType>,
}

impl PixChargeRequest {
    /// The effective key type: caller-supplied, or inferred.
    pub fn effective_key_type(&self) -> PixKeyType {
        self.key_type.unwrap_or_else(|| PixKeyType::infer(&self.key))
    }

    /// Validate before any network call.
    pub fn validate(&self) -> Result<(), (ErrorCode, String)> {
        if self.key.trim().is_empty() {
            return Err((
                ErrorCode::InvalidParameters,
                "pix key is required".to_string(),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err((
                ErrorCode::InvalidAmount,
                format!("pix amount must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}

/// Receipt for a sent PIX payment.
#[derive(Clone, Debug, Serialize)]
pub struct PixPayment {
    pub transaction_id: String,
    pub end_to_end_id: Option<String>,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub key: String,
    pub key_type: PixKeyType,
}

/// A PIX key registered on the account.
#[derive(Clone, Debug, Serialize)]
pub struct PixKeyInfo {
    pub key: String,
    pub key_type: PixKeyType,
    pub created_at: Option<DateTime<Utc>>,
}

/// A generated PIX QR charge.
#[derive(Clone, Debug, Serialize)]
pub struct PixQrCode {
    /// EMV "copy and paste" payload.
    pub payload: String,
    pub txid: String,
    pub amount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Assemble an EMV-style BR Code payload for a static PIX charge.
///
/// Used by adapters whose backend returns the charge components instead of
/// a ready payload.
pub fn emv_qr_payload(key: &str, amount: Decimal, merchant_name: &str, txid: &str) -> String {
    let account = format!("{}{}", tlv("00", "br.gov.bcb.pix"), tlv("01", key));
    let additional = tlv("05", txid);
    let mut payload = String::new();
    payload.push_str(&tlv("00", "01"));
    payload.push_str(&tlv("26", &account));
    payload.push_str(&tlv("52", "0000"));
    payload.push_str(&tlv("53", "986"));
    if amount > Decimal::ZERO {
        payload.push_str(&tlv("54", &amount.round_dp(2).to_string()));
    }
    payload.push_str(&tlv("58", "BR"));
    payload.push_str(&tlv("59", merchant_name));
    payload.push_str(&tlv("60", "SAO PAULO"));
    payload.push_str(&tlv("62", &additional));
    payload.push_str("6304");
    let crc = crc16_ccitt(payload.as_bytes());
    payload.push_str(&format!("{crc:04X}"));
    payload
}

fn tlv(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}

/// CRC-16/CCITT-FALSE, as required by the BR Code field 63.
fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_infer_email() {
        assert_eq!(PixKeyType::infer("user@example.com"), PixKeyType::Email);
    }

    #[test]
    fn test_infer_phone_with_prefix() {
        assert_eq!(PixKeyType::infer("+5511999999999"), PixKeyType::Phone);
    }

    #[test]
    fn test_infer_cpf() {
        assert_eq!(PixKeyType::infer("11144477735"), PixKeyType::Cpf);
    }

    #[test]
    fn test_infer_cnpj() {
        assert_eq!(PixKeyType::infer("11222333000181"), PixKeyType::Cnpj);
    }

    #[test]
    fn test_infer_random_key() {
        assert_eq!(
            PixKeyType::infer("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6"),
            PixKeyType::Evp
        );
    }

    #[test]
    fn test_infer_phone_like_digit_string() {
        // 10 digits, not a CPF, falls into the phone-like rule
        assert_eq!(PixKeyType::infer("1199999999"), PixKeyType::Phone);
    }

    #[test]
    fn test_infer_short_numeric_defaults_to_evp() {
        assert_eq!(PixKeyType::infer("12345"), PixKeyType::Evp);
    }

    #[test]
    fn test_cpf_rule_wins_over_phone_rule() {
        // 11 digits matches both the CPF rule and the phone-like rule;
        // the CPF rule comes first.
        assert_eq!(PixKeyType::infer("11144477735"), PixKeyType::Cpf);
    }

    #[test]
    fn test_charge_validation() {
        let charge = PixChargeRequest {
            key: String::new(),
            amount: dec!(10),
            description: None,
            key_type: None,
        };
        assert_eq!(charge.validate().unwrap_err().0, ErrorCode::InvalidParameters);

        let charge = PixChargeRequest {
            key: "user@example.com".to_string(),
            amount: Decimal::ZERO,
            description: None,
            key_type: None,
        };
        assert_eq!(charge.validate().unwrap_err().0, ErrorCode::InvalidAmount);

        let charge = PixChargeRequest {
            key: "user@example.com".to_string(),
            amount: dec!(0.01),
            description: None,
            key_type: None,
        };
        assert!(charge.validate().is_ok());
    }

    #[test]
    fn test_explicit_key_type_wins_over_inference() {
        let charge = PixChargeRequest {
            key: "user@example.com".to_string(),
            amount: dec!(1),
            description: None,
            key_type: Some(PixKeyType::Evp),
        };
        assert_eq!(charge.effective_key_type(), PixKeyType::Evp);
    }

    #[test]
    fn test_crc16_known_vector() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_emv_payload_shape() {
        let payload = emv_qr_payload("user@example.com", dec!(10.50), "PIXDESK", "TX123");
        assert!(payload.starts_with("000201"));
        assert!(payload.contains("br.gov.bcb.pix"));
        assert!(payload.contains("user@example.com"));
        assert!(payload.contains("540510.50"));
        // last six chars are the CRC field: "6304" + 4 hex digits
        let crc_field = &payload[payload.len() - 8..];
        assert!(crc_field.starts_with("6304"));
        assert!(crc_field[4..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_emv_payload_omits_zero_amount() {
        let payload = emv_qr_payload("user@example.com", Decimal::ZERO, "PIXDESK", "TX123");
        // the currency field is followed directly by the country field
        assert!(payload.contains("53039865802BR"));
    }
}
