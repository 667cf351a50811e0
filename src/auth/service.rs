/// Auth orchestrator.
///
/// Composes the token issuer and the session store: rotation of a previous
/// refresh token, issuance of a new identity/refresh pair, and bulk session
/// revocation. Signing keys and TTLs are injected once at construction and
/// shared read-only across requests.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use uuid::Uuid;

use crate::auth::claims::{IdentityClaims, RefreshClaims};
use crate::auth::token::{
    issue_identity_token, issue_refresh_token, verify_identity_token, verify_refresh_token,
};
use crate::error::AppError;
use crate::session::SessionStore;
use crate::users::User;

/// The externally visible result of a sign-in or refresh: the identity and
/// refresh tokens are issued together but only the refresh side has
/// server-side state.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub id_token: String,
    pub refresh_token: String,
    pub refresh_token_id: Uuid,
    pub user_id: Uuid,
}

pub struct AuthService {
    session_store: Arc<dyn SessionStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    refresh_secret: String,
    id_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl AuthService {
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        refresh_secret: String,
        id_token_expiry: i64,
        refresh_token_expiry: i64,
    ) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|err| AppError::internal(format!("invalid identity private key: {}", err)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|err| AppError::internal(format!("invalid identity public key: {}", err)))?;

        Ok(Self {
            session_store,
            encoding_key,
            decoding_key,
            refresh_secret,
            id_token_expiry,
            refresh_token_expiry,
        })
    }

    /// Issues a fresh identity/refresh token pair for `user`.
    ///
    /// On the refresh path `previous_token_id` is the jti being rotated out;
    /// it is deleted from the session store before anything is issued, so a
    /// concurrent replay of the same token sees "already deleted" and is
    /// rejected. Any failure of that deletion, including not-found, aborts
    /// the call. If persisting the new session fails, the freshly minted
    /// tokens are discarded and an error is returned instead.
    pub async fn issue_token_pair(
        &self,
        user: &User,
        previous_token_id: Option<Uuid>,
    ) -> Result<TokenPair, AppError> {
        if let Some(previous) = previous_token_id {
            self.session_store
                .delete_session(user.id, previous)
                .await?;
        }

        let id_token = issue_identity_token(user, &self.encoding_key, self.id_token_expiry)?;

        let refresh =
            issue_refresh_token(user.id, &self.refresh_secret, self.refresh_token_expiry)?;

        self.session_store
            .set_session(user.id, refresh.id, refresh.expires_in)
            .await?;

        tracing::info!(user_id = %user.id, token_id = %refresh.id, "issued token pair");

        Ok(TokenPair {
            id_token,
            refresh_token: refresh.token,
            refresh_token_id: refresh.id,
            user_id: user.id,
        })
    }

    /// Revokes every session of `user_id`. Used on explicit sign-out and on
    /// token-leak response.
    pub async fn invalidate_all_sessions(&self, user_id: Uuid) -> Result<(), AppError> {
        self.session_store.delete_all_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, "invalidated all sessions");
        Ok(())
    }

    /// Verifies an identity token against the service's public key.
    pub fn verify_identity(&self, token: &str) -> Result<IdentityClaims, AppError> {
        verify_identity_token(token, &self.decoding_key)
    }

    /// Verifies a refresh token against the shared secret.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AppError> {
        verify_refresh_token(token, &self.refresh_secret)
    }

    pub fn id_token_expiry(&self) -> i64 {
        self.id_token_expiry
    }
}
