/// Authentication core
///
/// Password hashing, dual-token issuance (RS256 identity + HS256 refresh),
/// refresh-token rotation, and the orchestration over the session store.

mod claims;
mod password;
mod service;
mod token;

pub use claims::{IdentityClaims, RefreshClaims};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, TokenPair};
pub use token::{
    issue_identity_token, issue_refresh_token, verify_identity_token, verify_refresh_token,
    RefreshTokenBundle,
};
