//! JWT bearer token validation
//!
//! Hearth validates tokens minted by the identity service; it never issues
//! tokens to end users. The dev-mode validator skips signature checks so
//! local setups can hand-craft tokens.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{HearthError, Result};

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Issued-at, unix seconds
    pub iat: u64,
    /// Expiry, unix seconds
    pub exp: u64,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Validates (and, for service use, mints) bearer tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator over a shared HMAC secret
    pub fn new(secret: &str, expiry_seconds: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(HearthError::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            expiry_seconds,
        })
    }

    /// Dev-mode validator: signature checks disabled
    pub fn new_dev() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(b"dev"),
            decoding: DecodingKey::from_secret(b"dev"),
            validation,
            expiry_seconds: 3600,
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Mint a token for a user id (tests and service-to-service calls)
    pub fn generate_token(&self, user_id: &str) -> Result<(String, u64)> {
        let now = Self::now();
        let exp = now + self.expiry_seconds;
        let claims = Claims {
            sub: user_id.to_string(),
            iss: Some("hearth".to_string()),
            iat: now,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| HearthError::Auth(format!("Failed to sign token: {}", e)))?;
        Ok((token, exp))
    }

    /// Verify a token and extract its claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let jwt = JwtValidator::new("unit-test-secret", 3600).unwrap();
        let (token, exp) = jwt.generate_token("user-a").unwrap();
        assert!(exp > JwtValidator::now());

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        assert_eq!(result.claims.unwrap().sub, "user-a");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let minter = JwtValidator::new("secret-a", 3600).unwrap();
        let verifier = JwtValidator::new("secret-b", 3600).unwrap();
        let (token, _) = minter.generate_token("user-a").unwrap();
        assert!(!verifier.verify_token(&token).valid);
    }

    #[test]
    fn dev_validator_accepts_foreign_signature() {
        let minter = JwtValidator::new("whatever", 3600).unwrap();
        let (token, _) = minter.generate_token("user-a").unwrap();
        let result = JwtValidator::new_dev().verify_token(&token);
        assert!(result.valid);
        assert_eq!(result.claims.unwrap().sub, "user-a");
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        assert!(JwtValidator::new("", 3600).is_err());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
