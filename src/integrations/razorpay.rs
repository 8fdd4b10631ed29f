//! Razorpay Orders API client and payment signature verification.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::{config::RazorpayConfig, error::AppError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Seam over the payment provider so services never talk HTTP directly.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, AppError>;
}

pub struct RazorpayClient {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[derive(Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Deserialize)]
struct RazorpayErrorDetail {
    description: Option<String>,
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, AppError> {
        let url = format!("{}/orders", self.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("razorpay request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<RazorpayErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.description)
                .unwrap_or_else(|| "no description".to_string());
            return Err(AppError::Upstream(format!(
                "razorpay returned {status}: {detail}"
            )));
        }

        let order = response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid razorpay response: {e}")))?;
        tracing::debug!(order_id = %order.id, amount = order.amount, "razorpay order created");
        Ok(order)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("payment signature is not valid hex")]
    Malformed,
    #[error("payment signature mismatch")]
    Mismatch,
    #[error("payment signing key rejected: {0}")]
    Key(String),
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Key(_) => AppError::Internal(anyhow::anyhow!(err)),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

fn payment_mac(
    secret: &str,
    order_id: &str,
    payment_id: &str,
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Key(e.to_string()))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Hex signature Razorpay attaches to a successful checkout.
pub fn sign_payment(
    secret: &str,
    order_id: &str,
    payment_id: &str,
) -> Result<String, SignatureError> {
    let mac = payment_mac(secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `signature` against `order_id|payment_id`.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
    payment_mac(secret, order_id, payment_id)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn signature_is_lowercase_hex_sha256() {
        let sig = sign_payment(SECRET, "order_ABC", "pay_XYZ").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = sign_payment(SECRET, "order_ABC", "pay_XYZ").unwrap();
        assert_eq!(
            verify_payment_signature(SECRET, "order_ABC", "pay_XYZ", &sig),
            Ok(())
        );
    }

    #[test]
    fn signature_is_bound_to_order_and_payment() {
        let sig = sign_payment(SECRET, "order_ABC", "pay_XYZ").unwrap();
        assert_eq!(
            verify_payment_signature(SECRET, "order_ABD", "pay_XYZ", &sig),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_payment_signature(SECRET, "order_ABC", "pay_XYY", &sig),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_payment_signature("other_secret", "order_ABC", "pay_XYZ", &sig),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn separator_is_part_of_the_message() {
        // "a|bc" and "ab|c" must not collide
        assert_ne!(
            sign_payment(SECRET, "a", "bc").unwrap(),
            sign_payment(SECRET, "ab", "c").unwrap()
        );
    }

    #[test]
    fn signing_key_errors_map_to_internal_not_client_errors() {
        let err: AppError = SignatureError::Key("bad key".into()).into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let err: AppError = SignatureError::Mismatch.into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn empty_secret_still_signs() {
        let sig = sign_payment("", "order_ABC", "pay_XYZ").unwrap();
        assert_eq!(verify_payment_signature("", "order_ABC", "pay_XYZ", &sig), Ok(()));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert_eq!(
            verify_payment_signature(SECRET, "order_ABC", "pay_XYZ", "not-hex"),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_payment_signature(SECRET, "order_ABC", "pay_XYZ", "abcd"),
            Err(SignatureError::Mismatch)
        );
    }
}
