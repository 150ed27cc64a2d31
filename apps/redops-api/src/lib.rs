pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod repositories;
pub mod routes;

use std::sync::Arc;

use auth::tokens::JwtKeys;
use config::Config;
use db::store::DocumentStore;
use gateway::Hub;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub hub: Hub,
    pub keys: Arc<JwtKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, hub: Hub) -> Self {
        Self {
            store,
            hub,
            keys: Arc::new(JwtKeys::from_secret(&config.jwt_secret)),
            config: Arc::new(config),
        }
    }
}
