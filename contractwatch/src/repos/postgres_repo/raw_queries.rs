use serde::de::DeserializeOwned;
use tokio_postgres::{types::ToSql, Client, NoTls};

use crate::repos::repo::{
    ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, Migratable, RepoError,
    RepoMigrations, SQLikeMigrations,
};

use super::PostgresRepo;

pub type PostgresRepoClient = Client;

const NO_PARAMS: &[&(dyn ToSql + Sync)] = &[];

#[async_trait::async_trait]
impl HasRawQueryClient for PostgresRepo {
    type Client = Client;

    async fn get_client(&self) -> Result<Client, RepoError> {
        let (client, conn) = tokio_postgres::connect(&self.url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(error) = conn.await {
                tracing::error!("postgres connection error: {error}");
            }
        });

        Ok(client)
    }
}

#[async_trait::async_trait]
impl ExecutesWithRawQuery for PostgresRepo {
    async fn execute(client: &Client, query: &str) -> Result<u64, RepoError> {
        client.execute(query, NO_PARAMS).await.map_err(RepoError::from)
    }
}

#[async_trait::async_trait]
impl LoadsDataWithRawQuery for PostgresRepo {
    async fn load_data<Data: Send + DeserializeOwned>(
        client: &Client,
        query: &str,
    ) -> Result<Option<Data>, RepoError> {
        let mut data_list: Vec<Data> = Self::load_data_list(client, query).await?;

        if data_list.len() > 1 {
            return Err(RepoError::Unknown(format!(
                "query returned {} rows where at most one was expected",
                data_list.len()
            )));
        }

        Ok(data_list.pop())
    }

    async fn load_data_list<Data: Send + DeserializeOwned>(
        client: &Client,
        query: &str,
    ) -> Result<Vec<Data>, RepoError> {
        let json_aggregate = get_json_aggregate(client, query).await?;

        if json_aggregate.is_object() || json_aggregate.is_array() {
            serde_json::from_value(json_aggregate)
                .map_err(|error| RepoError::Unknown(error.to_string()))
        } else {
            Ok(vec![])
        }
    }
}

impl Migratable for PostgresRepo {}

impl RepoMigrations for PostgresRepo {
    fn create_checked_headers_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_checked_headers()
    }
}

async fn get_json_aggregate(client: &Client, query: &str) -> Result<serde_json::Value, RepoError> {
    let rows = client.query(json_aggregate_query(query).as_str(), NO_PARAMS).await?;

    let row = rows
        .first()
        .ok_or_else(|| RepoError::Unknown("json aggregate returned no rows".to_string()))?;

    row.try_get(0).map_err(RepoError::from)
}

fn json_aggregate_query(query: &str) -> String {
    format!("WITH result AS ({query}) SELECT COALESCE(json_agg(result), '[]'::json) FROM result")
}
