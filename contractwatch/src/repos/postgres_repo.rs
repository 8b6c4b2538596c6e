mod raw_queries;

pub use raw_queries::PostgresRepoClient;

use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::NoTls;

use super::repo::RepoError;

pub type Pool = bb8::Pool<PostgresConnectionManager<NoTls>>;
pub type Conn<'a> = bb8::PooledConnection<'a, PostgresConnectionManager<NoTls>>;

#[derive(Clone)]
pub struct PostgresRepo {
    url: String,
}

impl PostgresRepo {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    pub async fn get_pool(&self, max_size: u32) -> Result<Pool, RepoError> {
        let manager = PostgresConnectionManager::new_from_stringlike(&self.url, NoTls)
            .map_err(RepoError::from)?;

        bb8::Pool::builder()
            .max_size(max_size)
            .build(manager)
            .await
            .map_err(RepoError::from)
    }

    pub async fn get_conn<'a>(pool: &'a Pool) -> Result<Conn<'a>, RepoError> {
        pool.get().await.map_err(|error| match error {
            bb8::RunError::User(error) => RepoError::from(error),
            bb8::RunError::TimedOut => RepoError::NotConnected,
        })
    }
}

impl From<tokio_postgres::Error> for RepoError {
    fn from(error: tokio_postgres::Error) -> Self {
        if error.is_closed() {
            RepoError::NotConnected
        } else {
            RepoError::Unknown(error.to_string())
        }
    }
}
