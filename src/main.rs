use std::net::TcpListener;
use std::sync::Arc;

use authgate::configuration::get_configuration;
use authgate::session::PgSessionStore;
use authgate::startup::run;
use authgate::telemetry::init_telemetry;
use authgate::users::PgUserDirectory;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|err| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("failed to read configuration: {}", err),
        )
    })?;

    init_telemetry(&configuration.application.environment);
    tracing::info!("starting application");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&configuration.database.connection_string())
        .map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid database configuration: {}", err),
            )
        })?;

    let directory = Arc::new(PgUserDirectory::new(pool.clone()));
    let session_store = Arc::new(PgSessionStore::new(pool));

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "server listening");

    let server = run(listener, directory, session_store, configuration)?;
    server.await
}
