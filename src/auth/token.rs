/// Token issuance and verification.
///
/// Identity tokens are signed RS256 with the service's private key; the
/// paired public key is distributed to verifiers. Refresh tokens are signed
/// HS256 with a shared secret and carry a fresh time-ordered token id (jti)
/// per issuance.

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{IdentityClaims, RefreshClaims};
use crate::error::AppError;
use crate::users::User;

/// The signed refresh token together with its id and remaining lifetime, so
/// the caller can persist the session record without re-parsing the token.
#[derive(Debug, Clone)]
pub struct RefreshTokenBundle {
    pub token: String,
    pub id: Uuid,
    pub expires_in: Duration,
}

/// Signs an identity token for `user`. Signing failure is an internal error;
/// no partially-signed token is ever returned.
pub fn issue_identity_token(
    user: &User,
    key: &EncodingKey,
    expiry_seconds: i64,
) -> Result<String, AppError> {
    let claims = IdentityClaims::new(user.clone(), expiry_seconds);

    encode(&Header::new(Algorithm::RS256), &claims, key)
        .map_err(|err| AppError::internal(format!("could not sign identity token: {}", err)))
}

/// Verifies an identity token signature and temporal claims. Any failure is
/// an authorization error with a generic message.
pub fn verify_identity_token(token: &str, key: &DecodingKey) -> Result<IdentityClaims, AppError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_nbf = true;

    decode::<IdentityClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::warn!(error = %err, "identity token rejected");
            AppError::authorization("invalid or expired token")
        })
}

/// Signs a refresh token for `user_id` with a fresh UUIDv7 token id.
pub fn issue_refresh_token(
    user_id: Uuid,
    secret: &str,
    expiry_seconds: i64,
) -> Result<RefreshTokenBundle, AppError> {
    let token_id = Uuid::now_v7();
    let claims = RefreshClaims::new(user_id, token_id, expiry_seconds);

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::internal(format!("could not sign refresh token: {}", err)))?;

    Ok(RefreshTokenBundle {
        token,
        id: token_id,
        expires_in: Duration::seconds(expiry_seconds),
    })
}

/// Verifies a refresh token signature and expiry.
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| {
        tracing::warn!(error = %err, "refresh token rejected");
        AppError::authorization("invalid refresh token")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PRIVATE_KEY_PEM: &str = include_str!("../../tests/fixtures/identity_test.pem");
    const PUBLIC_KEY_PEM: &str = include_str!("../../tests/fixtures/identity_test.pub.pem");

    fn keys() -> (EncodingKey, DecodingKey) {
        (
            EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap(),
            DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM.as_bytes()).unwrap(),
        )
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn identity_token_roundtrip() {
        let (encoding_key, decoding_key) = keys();
        let user = sample_user();

        let token = issue_identity_token(&user, &encoding_key, 900).unwrap();
        let claims = verify_identity_token(&token, &decoding_key).unwrap();

        assert_eq!(claims.user.id, user.id);
        assert_eq!(claims.user.email, user.email);
        assert_eq!(claims.exp, claims.iat + 900);
        assert_eq!(claims.nbf, claims.iat);
        // The embedded snapshot never carries the stored hash.
        assert!(claims.user.password_hash.is_empty());
    }

    #[test]
    fn tampered_identity_token_is_rejected() {
        let (encoding_key, decoding_key) = keys();
        let token = issue_identity_token(&sample_user(), &encoding_key, 900).unwrap();

        let tampered = format!("{}x", token);
        let err = verify_identity_token(&tampered, &decoding_key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn refresh_token_roundtrip_with_fresh_jti() {
        let user_id = Uuid::new_v4();

        let first = issue_refresh_token(user_id, "shared-secret", 259_200).unwrap();
        let second = issue_refresh_token(user_id, "shared-secret", 259_200).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.expires_in, Duration::seconds(259_200));

        let claims = verify_refresh_token(&first.token, "shared-secret").unwrap();
        assert_eq!(claims.uid, user_id);
        assert_eq!(claims.jti, first.id);
    }

    #[test]
    fn refresh_token_signed_with_other_secret_is_rejected() {
        let bundle = issue_refresh_token(Uuid::new_v4(), "shared-secret", 259_200).unwrap();

        let err = verify_refresh_token(&bundle.token, "other-secret").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
