use std::collections::HashSet;

use ethers::utils::hex;

use crate::contracts::{Contract, ContractEvent};
use crate::converter::EventRow;
use crate::piping::{PipeCache, PipedRow};
use crate::repos::{ExecutesWithRawQuery, Pool, PostgresRepo, RepoError};
use crate::values;

/// Owns the per-contract event tables: creates the contract's schema and the
/// event's table on first use and persists converted rows idempotently.
pub struct EventRepository {
    pool: Pool,
    cache: PipeCache,
    created_tables: HashSet<String>,
}

impl EventRepository {
    pub fn new(pool: Pool, cache: PipeCache) -> Self {
        Self {
            pool,
            cache,
            created_tables: HashSet::new(),
        }
    }

    /// Persists all rows for one event at one header in a single
    /// transaction, deduplicated on `(header_id, tx_idx, log_idx)`. When the
    /// contract pipes, each row's indexed arguments are published for the
    /// method poller.
    pub async fn persist_logs(
        &mut self,
        rows: &[EventRow],
        event: &ContractEvent,
        contract: &Contract,
    ) -> Result<(), RepoError> {
        if rows.is_empty() {
            return Ok(());
        }

        self.ensure_event_table(event, contract).await?;

        let table = qualified_table_name(&contract.address, &event.name);
        let mut conn = PostgresRepo::get_conn(&self.pool).await?;
        let txn = conn.transaction().await.map_err(RepoError::from)?;

        for row in rows {
            let mut columns = vec![
                "header_id".to_string(),
                "log_idx".to_string(),
                "tx_idx".to_string(),
                "raw_log".to_string(),
            ];
            let mut literals = vec![
                row.header_id.to_string(),
                row.log_idx.to_string(),
                row.tx_idx.to_string(),
                format!("'\\x{}'", hex::encode(&row.raw_log)),
            ];

            for (position, field) in row.fields.iter().enumerate() {
                columns.push(values::column_name(&field.name, position));
                literals.push(values::sql_value(&field.value));
            }

            txn.execute(
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})
                    ON CONFLICT (header_id, tx_idx, log_idx) DO NOTHING",
                    columns.join(", "),
                    literals.join(", ")
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(RepoError::from)?;
        }

        txn.commit().await.map_err(RepoError::from)?;

        if contract.piping {
            self.cache
                .publish(&contract.address, &event.name, piped_rows(rows))
                .await;
        }

        Ok(())
    }

    async fn ensure_event_table(
        &mut self,
        event: &ContractEvent,
        contract: &Contract,
    ) -> Result<(), RepoError> {
        let table = qualified_table_name(&contract.address, &event.name);

        if self.created_tables.contains(&table) {
            return Ok(());
        }

        let mut columns = String::new();
        for (position, input) in event.value.inputs.iter().enumerate() {
            columns.push_str(&format!(
                "{} {} NOT NULL,\n                ",
                values::column_name(&input.name, position),
                values::sql_type(&input.kind)
            ));
        }

        let conn = PostgresRepo::get_conn(&self.pool).await?;
        PostgresRepo::execute(
            &conn,
            &format!("CREATE SCHEMA IF NOT EXISTS {}", schema_name(&contract.address)),
        )
        .await?;
        PostgresRepo::execute(
            &conn,
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                id SERIAL PRIMARY KEY,
                header_id INTEGER NOT NULL REFERENCES public.headers (id) ON DELETE CASCADE,
                log_idx INTEGER NOT NULL,
                tx_idx INTEGER NOT NULL,
                raw_log BYTEA,
                {columns}UNIQUE (header_id, tx_idx, log_idx)
            )"
            ),
        )
        .await?;

        self.created_tables.insert(table);

        Ok(())
    }
}

pub fn schema_name(address: &str) -> String {
    format!("header_{}", address.to_lowercase())
}

pub fn qualified_table_name(address: &str, event_name: &str) -> String {
    format!("{}.{}", schema_name(address), event_name.to_lowercase())
}

fn piped_rows(rows: &[EventRow]) -> Vec<PipedRow> {
    rows.iter()
        .map(|row| PipedRow {
            block_number: row.block_number,
            fields: row
                .fields
                .iter()
                .filter(|field| field.indexed)
                .map(|field| (field.name.clone(), field.value.clone()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod naming_test {
    use super::*;

    #[test]
    fn schemas_are_scoped_by_lowercase_address() {
        assert_eq!(
            schema_name("0x8dD5FbCe2F6a956C3022bA3663759011Dd51e73E"),
            "header_0x8dd5fbce2f6a956c3022ba3663759011dd51e73e"
        );
    }

    #[test]
    fn tables_are_named_after_the_event() {
        assert_eq!(
            qualified_table_name("0xABC0000000000000000000000000000000000abc", "Transfer"),
            "header_0xabc0000000000000000000000000000000000abc.transfer"
        );
    }
}
