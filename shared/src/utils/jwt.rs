use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::models::claims::TokenClaims;

#[derive(Debug, Error, PartialEq)]
pub enum JwtError {
    #[error("Token invalid atau expired")]
    InvalidToken,

    #[error("JWT secret tidak ditemukan")]
    MissingSecret,

    #[error("Token type tidak valid untuk endpoint ini")]
    InvalidTokenType,
}

/// Decode JWT dan validasi signature, hanya access token yang diterima
pub fn decode_access_token(token: &str, secret: &str) -> Result<TokenClaims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| JwtError::InvalidToken)?;

    // Business services hanya terima access token
    if !token_data.claims.is_access_token() {
        return Err(JwtError::InvalidTokenType);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-for-testing-only";

    fn create_test_token(token_type: &str, exp_offset_minutes: i64) -> String {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: 42,
            email: "admin@laundry.test".to_string(),
            role: "admin".to_string(),
            exp: (now + Duration::minutes(exp_offset_minutes)).timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
            jti: "test-jti-42".to_string(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap()
    }

    #[test]
    fn test_decode_access_token_success() {
        let token = create_test_token("access", 15);
        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_decode_reject_refresh_token() {
        let token = create_test_token("refresh", 15);
        assert_eq!(decode_access_token(&token, SECRET), Err(JwtError::InvalidTokenType));
    }

    #[test]
    fn test_decode_reject_wrong_secret() {
        let token = create_test_token("access", 15);
        assert_eq!(
            decode_access_token(&token, "another-secret"),
            Err(JwtError::InvalidToken)
        );
    }

    #[test]
    fn test_decode_reject_expired_token() {
        let token = create_test_token("access", -30);
        assert_eq!(decode_access_token(&token, SECRET), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_missing_secret() {
        let token = create_test_token("access", 15);
        assert_eq!(decode_access_token(&token, ""), Err(JwtError::MissingSecret));
    }
}
