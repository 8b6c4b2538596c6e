mod config;
mod contracts;
mod converter;
mod event_repository;
mod fetcher;
mod header_repository;
mod parser;
mod piping;
mod poller;
mod provider;
mod repos;
mod retriever;
mod transformer;
mod values;

pub use config::{ConfigError, DatabaseConfig, WatchConfig};
pub use contracts::{checked_column_id, Contract, ContractEntry, ContractEvent, ContractMethod};
pub use converter::{ConvertError, Converter, EventRow, LogField};
pub use event_repository::{qualified_table_name, schema_name, EventRepository};
pub use fetcher::{FetchError, Fetcher};
pub use header_repository::{Header, HeaderRepository};
pub use parser::{AbiError, AbiParser};
pub use piping::{PipeCache, PipedRow};
pub use poller::{method_table_name, PollError, Poller};
pub use provider::{ProviderError, WatchProvider};
pub use repos::{
    Conn, ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, Migratable, Pool,
    PostgresRepo, PostgresRepoClient, RepoError, RepoMigrations, SQLikeMigrations,
};
pub use retriever::BlockRetriever;
pub use transformer::{Transformer, WatchError};

pub mod providers {
    pub use crate::provider::get;
}

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

/// Runs the watch loop until shutdown: connects the repo and provider, runs
/// the internal migrations, initializes the transformer and ticks it at the
/// configured interval. Tick errors are logged and retried at the preserved
/// cursor; only init errors are fatal.
pub async fn watch(config: &WatchConfig) -> Result<(), WatchError> {
    config.validate()?;

    let repo = PostgresRepo::new(&config.database.url());
    let client = repo.get_client().await?;
    PostgresRepo::migrate(&client, PostgresRepo::get_internal_migrations()).await?;

    let pool = repo.get_pool(config.pool_size).await?;
    let provider = providers::get(&config.rpc_path)
        .map_err(|error| ConfigError::InvalidRpcPath(error.to_string()))?;

    let mut transformer = Transformer::new(config.clone(), provider, pool);
    transformer.init().await?;
    tracing::info!(start = transformer.start, "transformer initialized");

    let mut ticker = interval(Duration::from_millis(config.interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = transformer.execute().await {
                    tracing::error!("execution error for transformer: {error}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
        }
    }
}
