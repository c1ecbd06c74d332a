// src/main.rs
use env_logger::{Builder, Env};
use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use stock_user_profile::api::{external_routes, internal_routes};
use stock_user_profile::auth::Authenticator;
use stock_user_profile::config::{Config, MEMORY_STORE};
use stock_user_profile::db::{MemoryUserprofileStore, ScyllaUserprofileStore, UserprofileStore};
use stock_user_profile::service::UserprofileService;

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!("Failed to load .env: {}", e);
        }
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn UserprofileStore> = if config.db_connection_uri == MEMORY_STORE {
        warn!("Using in-memory userprofile store; data is lost on exit.");
        Arc::new(MemoryUserprofileStore::new())
    } else {
        match ScyllaUserprofileStore::connect(&config.db_connection_uri, &config.keyspace).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };
    let service = Arc::new(UserprofileService::new(store));

    let authenticator = match &config.jwt_secret {
        Some(secret) => Authenticator::with_secret(
            &config.audience,
            &config.authorization_server,
            &config.scope,
            secret.as_bytes(),
        ),
        None => match Authenticator::from_jwks(
            &config.audience,
            &config.authorization_server,
            &config.scope,
        )
        .await
        {
            Ok(authenticator) => authenticator,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let external = warp::serve(external_routes(service.clone(), Arc::new(authenticator)))
        .run(([0, 0, 0, 0], config.port));
    let internal = warp::serve(internal_routes(service)).run(([0, 0, 0, 0], config.internal_port));

    info!(
        "Server running on port {} (internal port {})",
        config.port, config.internal_port
    );
    tokio::join!(external, internal);
    ExitCode::SUCCESS
}
