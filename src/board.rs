use crate::config::{Config, PollDefaults};
use crate::db::Database;
use crate::error::Result;
use crate::gate::AccessGate;

/// Everything an interaction handler needs, shared across spawned tasks.
pub struct Board {
    pub database: Database,
    pub gate: AccessGate,
    pub poll_defaults: PollDefaults,
}

impl Board {
    pub async fn open(config: &Config) -> Result<Self> {
        let database = Database::connect(&config.database_url, config.max_connections).await?;
        Ok(Self {
            database,
            gate: AccessGate::new(config.passphrase.clone()),
            poll_defaults: config.poll.clone(),
        })
    }
}
