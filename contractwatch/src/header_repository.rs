use std::collections::HashSet;

use serde::Deserialize;

use crate::repos::{ExecutesWithRawQuery, LoadsDataWithRawQuery, Pool, PostgresRepo, RepoError};

/// A canonical header row ingested by the external header-sync process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Header {
    pub id: i64,
    pub block_number: i64,
    pub hash: String,
}

/// Owns every mutation of `checked_headers`, including its dynamically added
/// per-event and per-method boolean columns.
pub struct HeaderRepository {
    pool: Pool,
    known_columns: HashSet<String>,
}

impl HeaderRepository {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            known_columns: HashSet::new(),
        }
    }

    /// Idempotently adds a boolean column named `column_id` with default
    /// FALSE. The in-memory cache only skips round-trips; creation always
    /// goes through IF NOT EXISTS so correctness never depends on it.
    pub async fn add_check_column(&mut self, column_id: &str) -> Result<(), RepoError> {
        let column_id = column_id.to_lowercase();

        if self.known_columns.contains(&column_id) {
            return Ok(());
        }

        let conn = PostgresRepo::get_conn(&self.pool).await?;
        PostgresRepo::execute(
            &conn,
            &format!(
                "ALTER TABLE checked_headers
                ADD COLUMN IF NOT EXISTS {column_id} BOOLEAN NOT NULL DEFAULT FALSE"
            ),
        )
        .await?;

        self.known_columns.insert(column_id);

        Ok(())
    }

    /// Headers in `[lo, hi]` (`hi < 0` means unbounded) for which at least
    /// one of `column_ids` is unchecked, in ascending block number; ties on
    /// block number break on ascending id.
    pub async fn missing_headers_for_all(
        &self,
        lo: i64,
        hi: i64,
        column_ids: &[String],
    ) -> Result<Vec<Header>, RepoError> {
        if column_ids.is_empty() {
            return Ok(vec![]);
        }

        let all_checked = column_ids
            .iter()
            .map(|id| format!("checked_headers.{id}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let upper_bound = if hi < 0 {
            String::new()
        } else {
            format!("AND headers.block_number <= {hi}")
        };

        let conn = PostgresRepo::get_conn(&self.pool).await?;
        PostgresRepo::load_data_list(
            &conn,
            &format!(
                "SELECT headers.id AS id, headers.block_number AS block_number, headers.hash AS hash
                FROM headers
                LEFT JOIN checked_headers ON checked_headers.header_id = headers.id
                WHERE headers.block_number >= {lo} {upper_bound}
                AND (checked_headers.header_id IS NULL OR NOT ({all_checked}))
                ORDER BY headers.block_number ASC, headers.id ASC"
            ),
        )
        .await
    }

    /// Atomically upserts the `checked_headers` row for `header_id` and sets
    /// each listed column TRUE. Idempotent; one statement, one transaction.
    pub async fn mark_header_checked_for_all(
        &self,
        header_id: i64,
        column_ids: &[String],
    ) -> Result<(), RepoError> {
        if column_ids.is_empty() {
            return Ok(());
        }

        let columns = column_ids.join(", ");
        let trues = vec!["TRUE"; column_ids.len()].join(", ");
        let updates = column_ids
            .iter()
            .map(|id| format!("{id} = TRUE"))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = PostgresRepo::get_conn(&self.pool).await?;
        PostgresRepo::execute(
            &conn,
            &format!(
                "INSERT INTO checked_headers (header_id, {columns})
                VALUES ({header_id}, {trues})
                ON CONFLICT (header_id) DO UPDATE SET {updates}"
            ),
        )
        .await?;

        Ok(())
    }

    pub async fn mark_header_checked(
        &self,
        header_id: i64,
        column_id: &str,
    ) -> Result<(), RepoError> {
        self.mark_header_checked_for_all(header_id, &[column_id.to_string()]).await
    }
}
