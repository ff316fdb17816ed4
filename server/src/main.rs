use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use qtick_server::auth::StoreCredentialVerifier;
use qtick_server::clock::SystemClock;
use qtick_server::config::Config;
use qtick_server::lifecycle::LifecycleEngine;
use qtick_server::routes::create_routes;
use qtick_server::store::{catalog, PgStore, Store};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let mut store = PgStore::connect(&config.database_url, config.max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(store.pool())
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    catalog::register_all(&mut store)
        .await
        .expect("Failed to prepare statements");

    tokio::fs::create_dir_all(&config.artifact_dir)
        .await
        .expect("Failed to create artifact directory");

    let store: Arc<dyn Store> = Arc::new(store);
    let engine = LifecycleEngine::new(
        Arc::clone(&store),
        Arc::new(StoreCredentialVerifier::new(Arc::clone(&store))),
        Arc::new(SystemClock),
        config.artifact_dir.clone(),
    );

    let app = create_routes(Arc::new(engine));

    tracing::info!("Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
