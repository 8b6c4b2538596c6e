use serde::Deserialize;

use crate::repos::{LoadsDataWithRawQuery, Pool, PostgresRepo, RepoError};

#[derive(Deserialize)]
struct FirstBlock {
    block_number: Option<i64>,
}

/// Answers where the header-sync process started ingesting.
pub struct BlockRetriever {
    pool: Pool,
}

impl BlockRetriever {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// The smallest block number in `headers`, or `None` when the table is
    /// empty. Callers treat an empty table as block 0.
    pub async fn retrieve_first_block(&self) -> Result<Option<i64>, RepoError> {
        let conn = PostgresRepo::get_conn(&self.pool).await?;
        let first: Option<FirstBlock> = PostgresRepo::load_data(
            &conn,
            "SELECT MIN(block_number) AS block_number FROM headers",
        )
        .await?;

        Ok(first.and_then(|row| row.block_number))
    }
}
