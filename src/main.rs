use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace::{build_router, in_memory_state, postgres_state, Config};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting marketplace server");

    let config = Config::from_env().expect("Failed to load configuration");

    // Easy to switch between implementations: DATABASE_URL selects PostgreSQL
    let app_state = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");
            info!("Database connection pool created");

            postgres_state(pool, &config).expect("Failed to build application state")
        }
        None => {
            warn!("DATABASE_URL is not set, using in-memory stores");
            in_memory_state(&config).expect("Failed to build application state")
        }
    };

    let app = build_router(app_state, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(config.http_server_address)
        .await
        .expect("Failed to bind server address");
    info!(address = %config.http_server_address, "Server running");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
