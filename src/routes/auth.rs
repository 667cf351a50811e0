/// Authentication routes
///
/// Registration, sign-in, token refresh (rotation), sign-out, and current
/// user. Handlers are thin: validation and response shaping here, all
/// token/session semantics in `AuthService`. Password derivation is
/// CPU-bound and runs on the blocking pool.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, AuthService, IdentityClaims, TokenPair};
use crate::configuration::Environment;
use crate::error::AppError;
use crate::users::{NewUser, UserDirectory};
use crate::validators::{is_valid_email, is_valid_name};

const INVALID_CREDENTIALS: &str = "invalid email/password combination";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokenPair, expires_in: i64) -> Self {
        Self {
            id_token: pair.id_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// POST /auth/register
pub async fn register(
    form: web::Json<RegisterRequest>,
    directory: web::Data<dyn UserDirectory>,
    service: web::Data<AuthService>,
    environment: web::Data<Environment>,
) -> Result<HttpResponse, AppError> {
    let result: Result<HttpResponse, AppError> = async {
        let email = is_valid_email(&form.email)?;
        let name = is_valid_name(&form.name)?;

        let password = form.password.clone();
        let password_hash = web::block(move || hash_password(&password))
            .await
            .map_err(|err| AppError::internal(format!("blocking pool failure: {}", err)))??;

        let user = directory
            .create(NewUser {
                email,
                name,
                password_hash,
            })
            .await?;

        let pair = service.issue_token_pair(&user, None).await?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok(HttpResponse::Created().json(AuthResponse::new(pair, service.id_token_expiry())))
    }
    .await;

    result.map_err(|err| err.for_environment(&environment))
}

/// POST /auth/login
///
/// The same generic message is returned whether the email is unknown or the
/// password is wrong, to avoid revealing which factor failed.
pub async fn login(
    form: web::Json<LoginRequest>,
    directory: web::Data<dyn UserDirectory>,
    service: web::Data<AuthService>,
    environment: web::Data<Environment>,
) -> Result<HttpResponse, AppError> {
    let result: Result<HttpResponse, AppError> = async {
        let email = is_valid_email(&form.email)?;

        let user = directory
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::authorization(INVALID_CREDENTIALS))?;

        let stored_hash = user.password_hash.clone();
        let password = form.password.clone();
        let matches = web::block(move || verify_password(&stored_hash, &password))
            .await
            .map_err(|err| AppError::internal(format!("blocking pool failure: {}", err)))??;

        if !matches {
            return Err(AppError::authorization(INVALID_CREDENTIALS));
        }

        let pair = service.issue_token_pair(&user, None).await?;

        tracing::info!(user_id = %user.id, "user signed in");

        Ok(HttpResponse::Ok().json(AuthResponse::new(pair, service.id_token_expiry())))
    }
    .await;

    result.map_err(|err| err.for_environment(&environment))
}

/// POST /auth/refresh
///
/// Rotates the presented refresh token: its session record is deleted
/// before the replacement pair is issued, so a replayed token is rejected.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    directory: web::Data<dyn UserDirectory>,
    service: web::Data<AuthService>,
    environment: web::Data<Environment>,
) -> Result<HttpResponse, AppError> {
    let result: Result<HttpResponse, AppError> = async {
        let claims = service.verify_refresh(&form.refresh_token)?;

        let user = directory
            .find_by_id(claims.uid)
            .await?
            .ok_or_else(|| AppError::authorization("invalid refresh token"))?;

        let pair = service.issue_token_pair(&user, Some(claims.jti)).await?;

        tracing::info!(user_id = %user.id, "token pair refreshed");

        Ok(HttpResponse::Ok().json(AuthResponse::new(pair, service.id_token_expiry())))
    }
    .await;

    result.map_err(|err| err.for_environment(&environment))
}

/// POST /auth/logout
///
/// Revokes every session of the authenticated user ("log out everywhere").
pub async fn logout(
    claims: web::ReqData<IdentityClaims>,
    service: web::Data<AuthService>,
    environment: web::Data<Environment>,
) -> Result<HttpResponse, AppError> {
    service
        .invalidate_all_sessions(claims.user.id)
        .await
        .map_err(|err| err.for_environment(&environment))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "signed out" })))
}

/// GET /auth/me
pub async fn get_current_user(
    claims: web::ReqData<IdentityClaims>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(UserResponse {
        id: claims.user.id.to_string(),
        email: claims.user.email.clone(),
        name: claims.user.name.clone(),
    }))
}
