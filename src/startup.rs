use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};

use crate::auth::AuthService;
use crate::configuration::Settings;
use crate::error::AppError;
use crate::middleware::{IdentityMiddleware, RequestLogger};
use crate::routes::{get_current_user, health_check, login, logout, refresh, register};
use crate::session::SessionStore;
use crate::users::UserDirectory;

fn into_io_error(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
}

pub fn run(
    listener: TcpListener,
    directory: Arc<dyn UserDirectory>,
    session_store: Arc<dyn SessionStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let private_key = std::fs::read(&settings.auth.private_key_path)?;
    let public_key = std::fs::read(&settings.auth.public_key_path)?;

    let auth_service = AuthService::new(
        session_store,
        &private_key,
        &public_key,
        settings.auth.refresh_secret.clone(),
        settings.auth.id_token_expiry,
        settings.auth.refresh_token_expiry,
    )
    .map_err(into_io_error)?;

    let directory = web::Data::from(directory);
    let auth_service = web::Data::new(auth_service);
    let environment = web::Data::new(settings.application.environment.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(directory.clone())
            .app_data(auth_service.clone())
            .app_data(environment.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .service(
                        web::scope("")
                            .wrap(IdentityMiddleware::new(auth_service.clone()))
                            .route("/logout", web::post().to(logout))
                            .route("/me", web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
