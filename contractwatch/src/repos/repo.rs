use derive_more::Display;
use serde::de::DeserializeOwned;

#[derive(Debug, Display)]
pub enum RepoError {
    #[display(fmt = "repo is not connected")]
    NotConnected,
    #[display(fmt = "{}", _0)]
    Unknown(String),
}

#[async_trait::async_trait]
pub trait HasRawQueryClient {
    type Client: Send + Sync;

    async fn get_client(&self) -> Result<Self::Client, RepoError>;
}

#[async_trait::async_trait]
pub trait ExecutesWithRawQuery: HasRawQueryClient {
    async fn execute(client: &Self::Client, query: &str) -> Result<u64, RepoError>;
}

#[async_trait::async_trait]
pub trait LoadsDataWithRawQuery: HasRawQueryClient {
    async fn load_data<Data: Send + DeserializeOwned>(
        client: &Self::Client,
        query: &str,
    ) -> Result<Option<Data>, RepoError>;

    async fn load_data_list<Data: Send + DeserializeOwned>(
        client: &Self::Client,
        query: &str,
    ) -> Result<Vec<Data>, RepoError>;
}

#[async_trait::async_trait]
pub trait Migratable: ExecutesWithRawQuery + Sync + Send {
    async fn migrate(client: &Self::Client, migrations: Vec<&str>) -> Result<(), RepoError>
    where
        Self: Sized,
    {
        for migration in migrations {
            Self::execute(client, migration).await?;
        }

        Ok(())
    }
}

pub trait RepoMigrations: Migratable {
    fn create_checked_headers_migration() -> &'static [&'static str];

    fn get_internal_migrations() -> Vec<&'static str> {
        Self::create_checked_headers_migration().to_vec()
    }
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_checked_headers() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS checked_headers (
            id SERIAL PRIMARY KEY,
            header_id INTEGER UNIQUE NOT NULL REFERENCES headers (id) ON DELETE CASCADE
        )"]
    }
}
