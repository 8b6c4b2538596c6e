use std::collections::HashSet;

use derive_more::Display;
use ethers::abi::Token;

use crate::contracts::{Contract, ContractMethod};
use crate::event_repository::schema_name;
use crate::fetcher::{FetchError, Fetcher};
use crate::piping::PipeCache;
use crate::provider::WatchProvider;
use crate::repos::{ExecutesWithRawQuery, Pool, PostgresRepo, RepoError};
use crate::values;

#[derive(Debug, Display)]
pub enum PollError {
    #[display(fmt = "{}", _0)]
    Repo(RepoError),
    #[display(fmt = "{}", _0)]
    Fetch(FetchError),
    #[display(fmt = "method {} returned no output", _0)]
    NoOutput(String),
}

impl From<RepoError> for PollError {
    fn from(error: RepoError) -> Self {
        PollError::Repo(error)
    }
}

impl From<FetchError> for PollError {
    fn from(error: FetchError) -> Self {
        PollError::Fetch(error)
    }
}

/// Invokes each watched method at a header and persists the returns into the
/// contract's per-method tables. Arguments are piped from previously
/// persisted event rows when the contract enables piping.
pub struct Poller<P: WatchProvider> {
    fetcher: Fetcher<P>,
    pool: Pool,
    cache: PipeCache,
    created_tables: HashSet<String>,
}

impl<P: WatchProvider> Poller<P> {
    pub fn new(fetcher: Fetcher<P>, pool: Pool, cache: PipeCache) -> Self {
        Self {
            fetcher,
            pool,
            cache,
            created_tables: HashSet::new(),
        }
    }

    /// Polls every watched method of `contract` at `block_number`. A failure
    /// aborts the current header; the transformer retries it next tick.
    pub async fn poll_contract_at(
        &mut self,
        contract: &Contract,
        block_number: i64,
    ) -> Result<(), PollError> {
        if block_number < contract.starting_block || contract.methods.is_empty() {
            tracing::trace!(address = %contract.address, "not polling contract");
            return Ok(());
        }

        for method in contract.sorted_methods() {
            let argument_lists = self.argument_lists(contract, method, block_number).await;

            if argument_lists.is_empty() {
                tracing::trace!(
                    address = %contract.address,
                    method = %method.name,
                    "no pollable argument lists at this header"
                );
                continue;
            }

            self.ensure_method_table(contract, method).await?;

            for args in argument_lists {
                let returned = self
                    .fetcher
                    .fetch_contract_data(
                        &contract.parsed_abi,
                        &contract.address,
                        &method.name,
                        &args,
                        Some(block_number),
                    )
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| PollError::NoOutput(method.name.clone()))?;

                self.persist_result(contract, method, block_number, &args, &returned).await?;
            }
        }

        Ok(())
    }

    /// The argument lists to invoke `method` with. Zero-input methods get one
    /// empty list. Methods with inputs require piping: each cached event row
    /// at or before `block_number` whose indexed arguments cover every
    /// parameter yields one list, de-duplicated across rows. A method with
    /// inputs but no piping, or no covering row yet, is skipped.
    async fn argument_lists(
        &self,
        contract: &Contract,
        method: &ContractMethod,
        block_number: i64,
    ) -> Vec<Vec<Token>> {
        if method.value.inputs.is_empty() {
            return vec![vec![]];
        }

        if !contract.piping {
            return vec![];
        }

        let rows = self.cache.rows_for_contract(&contract.address, block_number).await;
        let mut seen = HashSet::new();
        let mut lists = vec![];

        for row in rows {
            let mut fields: Vec<_> = row.fields.iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));

            let mut partial: Vec<Vec<Token>> = vec![vec![]];
            for param in &method.value.inputs {
                let candidates: Vec<Token> = fields
                    .iter()
                    .filter(|(name, token)| {
                        let name_accepted = if contract.method_args.is_empty() {
                            **name == param.name
                        } else {
                            contract.method_args.contains(name.as_str())
                        };

                        name_accepted && token.type_check(&param.kind)
                    })
                    .map(|(_, token)| (*token).clone())
                    .collect();

                if candidates.is_empty() {
                    partial.clear();
                    break;
                }

                partial = partial
                    .iter()
                    .flat_map(|list| {
                        candidates.iter().map(|candidate| {
                            let mut extended = list.clone();
                            extended.push(candidate.clone());
                            extended
                        })
                    })
                    .collect();
            }

            for args in partial {
                let key = args.iter().map(values::display_value).collect::<Vec<_>>().join(",");
                if seen.insert(key) {
                    lists.push(args);
                }
            }
        }

        lists
    }

    async fn persist_result(
        &self,
        contract: &Contract,
        method: &ContractMethod,
        block_number: i64,
        args: &[Token],
        returned: &Token,
    ) -> Result<(), RepoError> {
        let table = method_table_name(&contract.address, &method.name);

        let mut columns = vec!["token_name".to_string(), "block".to_string()];
        let mut literals = vec![values::quote_str(&contract.name), block_number.to_string()];
        let mut conflict_target = vec!["block".to_string()];

        for (position, (param, arg)) in method.value.inputs.iter().zip(args).enumerate() {
            let column = values::column_name(&param.name, position);
            conflict_target.push(column.clone());
            columns.push(column);
            literals.push(values::sql_value(arg));
        }

        columns.push("returned".to_string());
        literals.push(values::sql_value(returned));

        let conn = PostgresRepo::get_conn(&self.pool).await?;
        PostgresRepo::execute(
            &conn,
            &format!(
                "INSERT INTO {table} ({}) VALUES ({})
                ON CONFLICT ({}) DO NOTHING",
                columns.join(", "),
                literals.join(", "),
                conflict_target.join(", ")
            ),
        )
        .await?;

        Ok(())
    }

    async fn ensure_method_table(
        &mut self,
        contract: &Contract,
        method: &ContractMethod,
    ) -> Result<(), RepoError> {
        let table = method_table_name(&contract.address, &method.name);

        if self.created_tables.contains(&table) {
            return Ok(());
        }

        let mut columns = String::new();
        let mut unique = vec!["block".to_string()];
        for (position, param) in method.value.inputs.iter().enumerate() {
            let column = values::column_name(&param.name, position);
            columns.push_str(&format!(
                "{column} {} NOT NULL,\n                ",
                values::sql_type(&param.kind)
            ));
            unique.push(column);
        }

        let returned_type = method
            .value
            .outputs
            .first()
            .map(|output| values::sql_type(&output.kind))
            .unwrap_or_else(|| "TEXT".to_string());

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
                token_name CHARACTER VARYING,
                block INTEGER NOT NULL,
                {columns}returned {returned_type} NOT NULL,
                UNIQUE ({})
            )",
                unique.join(", ")
            ),
        )
        .await?;

        self.created_tables.insert(table);

        Ok(())
    }
}

pub fn method_table_name(address: &str, method_name: &str) -> String {
    format!("{}.{}", schema_name(address), method_name.to_lowercase())
}
