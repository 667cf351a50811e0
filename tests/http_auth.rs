//! HTTP-level tests of the auth routes, run against an in-memory user
//! directory and session store so the suite needs no external services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::{test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use authgate::auth::AuthService;
use authgate::configuration::Environment;
use authgate::error::AppError;
use authgate::middleware::IdentityMiddleware;
use authgate::routes::{get_current_user, health_check, login, logout, refresh, register};
use authgate::session::{InMemorySessionStore, SessionStore};
use authgate::users::{NewUser, User, UserDirectory};

const PRIVATE_KEY_PEM: &str = include_str!("fixtures/identity_test.pem");
const PUBLIC_KEY_PEM: &str = include_str!("fixtures/identity_test.pub.pem");

#[derive(Default)]
struct InMemoryUserDirectory {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict("email already registered"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

fn auth_service() -> AuthService {
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    AuthService::new(
        store,
        PRIVATE_KEY_PEM.as_bytes(),
        PUBLIC_KEY_PEM.as_bytes(),
        "test-refresh-secret".to_string(),
        900,
        259_200,
    )
    .expect("failed to build auth service")
}

macro_rules! spawn_app {
    () => {{
        let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::default());
        let directory = web::Data::from(directory);
        let service = web::Data::new(auth_service());
        let environment = web::Data::new(Environment::Development);

        test::init_service(
            App::new()
                .app_data(directory)
                .app_data(service.clone())
                .app_data(environment)
                .route("/health_check", web::get().to(health_check))
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(register))
                        .route("/login", web::post().to(login))
                        .route("/refresh", web::post().to(refresh))
                        .service(
                            web::scope("")
                                .wrap(IdentityMiddleware::new(service.clone()))
                                .route("/logout", web::post().to(logout))
                                .route("/me", web::get().to(get_current_user)),
                        ),
                ),
        )
        .await
    }};
}

macro_rules! register_user {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "email": "john@example.com",
                "password": "SecurePass123",
                "name": "John Doe"
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn health_check_works() {
    let app = spawn_app!();
    let req = test::TestRequest::get().uri("/health_check").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn register_returns_tokens_and_login_accepts_the_password() {
    let app = spawn_app!();
    let body = register_user!(&app);
    assert!(body.get("id_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "john@example.com", "password": "SecurePass123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[actix_web::test]
async fn login_rejects_wrong_password_and_unknown_email_identically() {
    let app = spawn_app!();
    register_user!(&app);

    for payload in [
        json!({ "email": "john@example.com", "password": "WrongPass123" }),
        json!({ "email": "nobody@example.com", "password": "SecurePass123" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "invalid email/password combination");
    }
}

#[actix_web::test]
async fn register_rejects_duplicate_email() {
    let app = spawn_app!();
    register_user!(&app);

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "email": "john@example.com",
            "password": "OtherPass456",
            "name": "Impostor"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[actix_web::test]
async fn refresh_rotates_the_token_and_rejects_replay() {
    let app = spawn_app!();
    let body = register_user!(&app);
    let first_refresh = body["refresh_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": first_refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let rotated: Value = test::read_body_json(resp).await;
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), first_refresh);

    // The consumed token is spent.
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": first_refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn refresh_rejects_garbage_tokens() {
    let app = spawn_app!();

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": "definitely.not.valid" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn me_requires_and_honors_the_identity_token() {
    let app = spawn_app!();
    let body = register_user!(&app);
    let id_token = body["id_token"].as_str().unwrap();

    let req = test::TestRequest::get().uri("/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", id_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["email"], "john@example.com");
    assert_eq!(me["name"], "John Doe");
    assert!(me.get("password_hash").is_none());
}

#[actix_web::test]
async fn logout_invalidates_outstanding_refresh_tokens() {
    let app = spawn_app!();
    let body = register_user!(&app);
    let id_token = body["id_token"].as_str().unwrap().to_string();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(("Authorization", format!("Bearer {}", id_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}
