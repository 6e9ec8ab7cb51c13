use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{config::Config, events::EventBus};
use utils::assets::config_path;

/// Everything in one process: a local SQLite file and an in-memory event bus.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    events: EventBus,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::load(&config_path()).await?;
        Self::from_config(config).await
    }

    async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        let db_path = config.database_path();
        let db = DBService::new(&db_path, config.sqlite_max_connections).await?;
        let events = EventBus::new(
            config.event_channel_capacity,
            config.max_subscribers_per_topic,
        );

        tracing::info!(
            database = %db_path.display(),
            channel_capacity = config.event_channel_capacity,
            "Local deployment ready"
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            events,
        })
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
