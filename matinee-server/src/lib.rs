mod config;
mod context;
mod gateway;
pub mod logging;
mod protocol;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{routing::get, Router};
use log::info;
use matinee_collab::{Collab, DatabaseError, PgDatabase};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use config::{Config, ConfigError, DEFAULT_PORT};

use context::ServerContext;
use gateway::{websocket_handler, Gateway};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
    #[error("Could not bind or serve: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn hint(&self) -> String {
        match self {
            ServerError::Config(_) => {
                "Set MATINEE_DATABASE_URL (and optionally MATINEE_SERVER_PORT), then try again."
                    .to_string()
            }
            ServerError::Database(_) => {
                "This is a database error. Make sure the postgres instance is running and the connection url is correct, then try again."
                    .to_string()
            }
            ServerError::Io(_) => {
                "The listen address may already be in use. Pick a different port with MATINEE_SERVER_PORT."
                    .to_string()
            }
        }
    }
}

/// Starts the matinee server
pub async fn run_server(config: Config) -> Result<(), ServerError> {
    info!("Connecting to database...");
    let database = Arc::new(PgDatabase::new(&config.database_url).await?);

    let gateway = Gateway::new();
    let collab = Arc::new(Collab::new(database, gateway.clone()));

    let context = ServerContext { collab, gateway };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/v1/gateway", get(websocket_handler))
        .layer(cors)
        .with_state(context);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {addr}");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
