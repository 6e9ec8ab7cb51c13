//! The seam between the HTTP layer and the process that hosts it.
//!
//! Route handlers only see a `Deployment`: a database, an event bus and the
//! loaded configuration.

use async_trait::async_trait;
use db::DBService;
use services::services::{
    config::{Config, ConfigError},
    events::EventBus,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    /// Load configuration from the usual places and open everything.
    async fn new() -> Result<Self, DeploymentError>;

    async fn from_config(config: Config) -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn events(&self) -> &EventBus;

    /// Flush the WAL and close the pool.
    async fn shutdown(&self) {
        self.db().shutdown().await;
    }
}
