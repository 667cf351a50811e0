/// JWT claim payloads (RFC 7519 registered claim names).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::User;

/// Claims of an identity token: a full user snapshot (password hash is
/// excluded by the `User` serialization) plus the standard temporal claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityClaims {
    pub user: User,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl IdentityClaims {
    pub fn new(user: User, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            user,
            iat: now,
            nbf: now,
            exp: now + expiry_seconds,
        }
    }
}

/// Claims of a refresh token: the owning user id and a unique token id. The
/// token id is what the session store tracks.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub uid: Uuid,
    /// Token id (UUIDv7, time-ordered)
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, token_id: Uuid, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            uid: user_id,
            jti: token_id,
            iat: now,
            exp: now + expiry_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn identity_expiry_is_issued_at_plus_ttl() {
        let claims = IdentityClaims::new(sample_user(), 900);
        assert_eq!(claims.exp, claims.iat + 900);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn identity_payload_excludes_password_hash() {
        let claims = IdentityClaims::new(sample_user(), 900);
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn refresh_claims_carry_user_and_token_ids() {
        let user_id = Uuid::new_v4();
        let token_id = Uuid::now_v7();
        let claims = RefreshClaims::new(user_id, token_id, 259_200);

        assert_eq!(claims.uid, user_id);
        assert_eq!(claims.jti, token_id);
        assert_eq!(claims.exp, claims.iat + 259_200);
    }
}
