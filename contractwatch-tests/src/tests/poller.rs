#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use contractwatch::{
        method_table_name, schema_name, Fetcher, LoadsDataWithRawQuery, PipeCache, PipedRow,
        Poller, PostgresRepo,
    };
    use ethers::abi::Token;
    use ethers::types::H160;
    use serde_json::Value;

    use crate::factory::{encoded_uint, token_contract, StubProvider, TO_ADDRESS};
    use crate::test_runner;

    fn poller_with(
        provider: StubProvider,
        pool: contractwatch::Pool,
        cache: PipeCache,
    ) -> Poller<StubProvider> {
        Poller::new(
            Fetcher::new(Arc::new(provider), Duration::from_secs(5)),
            pool,
            cache,
        )
    }

    fn piped_transfer(block_number: i64) -> PipedRow {
        PipedRow {
            block_number,
            fields: HashMap::from([(
                "to".to_string(),
                Token::Address(H160::from_str(TO_ADDRESS).unwrap()),
            )]),
        }
    }

    #[tokio::test]
    async fn skips_contracts_below_their_starting_block() {
        test_runner::run_test(|pool, client| async move {
            let mut contract = token_contract("40");
            contract.starting_block = 500;
            let address = contract.address.clone();
            test_runner::drop_contract_schema(&client, &address).await;

            let mut poller = poller_with(StubProvider::default(), pool, PipeCache::new());
            poller.poll_contract_at(&contract, 499).await.unwrap();

            let schema: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT schema_name FROM information_schema.schemata
                    WHERE schema_name = '{}'",
                    schema_name(&address)
                ),
            )
            .await
            .unwrap();
            assert!(schema.is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn skips_piped_methods_until_a_matching_row_arrives() {
        test_runner::run_test(|pool, client| async move {
            let mut contract = token_contract("41");
            contract.piping = true;
            contract.method_args = ["to".to_string()].into_iter().collect();
            let address = contract.address.clone();
            test_runner::drop_contract_schema(&client, &address).await;

            let cache = PipeCache::new();
            let mut poller = poller_with(
                StubProvider::default().with_call_result(encoded_uint(5)),
                pool,
                cache.clone(),
            );

            // Nothing cached yet: balanceOf must not be invoked.
            poller.poll_contract_at(&contract, 500).await.unwrap();
            let table: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT table_name FROM information_schema.tables
                    WHERE table_schema = '{}' AND table_name = 'balanceof'",
                    schema_name(&address)
                ),
            )
            .await
            .unwrap();
            assert!(table.is_none());

            cache.publish(&address, "Transfer", vec![piped_transfer(500)]).await;
            poller.poll_contract_at(&contract, 500).await.unwrap();

            let row: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!("SELECT * FROM {}", method_table_name(&address, "balanceOf")),
            )
            .await
            .unwrap();
            let row = row.unwrap();
            assert_eq!(row["block"].as_i64(), Some(500));
            assert_eq!(row["who_"], Value::String(TO_ADDRESS.to_string()));
            assert_eq!(row["returned"].as_i64(), Some(5));
        })
        .await;
    }

    #[tokio::test]
    async fn deduplicates_piped_argument_lists() {
        test_runner::run_test(|pool, client| async move {
            let mut contract = token_contract("42");
            contract.piping = true;
            contract.method_args = ["to".to_string()].into_iter().collect();
            let address = contract.address.clone();
            test_runner::drop_contract_schema(&client, &address).await;

            let cache = PipeCache::new();
            cache
                .publish(
                    &address,
                    "Transfer",
                    vec![piped_transfer(500), piped_transfer(501)],
                )
                .await;

            let mut poller = poller_with(
                StubProvider::default().with_call_result(encoded_uint(5)),
                pool,
                cache,
            );
            poller.poll_contract_at(&contract, 501).await.unwrap();

            let rows: Vec<Value> = PostgresRepo::load_data_list(
                &client,
                &format!("SELECT * FROM {}", method_table_name(&address, "balanceOf")),
            )
            .await
            .unwrap();

            assert_eq!(rows.len(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn ignores_cached_rows_from_future_blocks() {
        test_runner::run_test(|pool, client| async move {
            let mut contract = token_contract("43");
            contract.piping = true;
            contract.method_args = ["to".to_string()].into_iter().collect();
            let address = contract.address.clone();
            test_runner::drop_contract_schema(&client, &address).await;

            let cache = PipeCache::new();
            cache.publish(&address, "Transfer", vec![piped_transfer(600)]).await;

            let mut poller = poller_with(
                StubProvider::default().with_call_result(encoded_uint(5)),
                pool,
                cache,
            );
            poller.poll_contract_at(&contract, 599).await.unwrap();

            let table: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT table_name FROM information_schema.tables
                    WHERE table_schema = '{}' AND table_name = 'balanceof'",
                    schema_name(&address)
                ),
            )
            .await
            .unwrap();
            assert!(table.is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn an_identical_invocation_at_the_same_block_persists_once() {
        test_runner::run_test(|pool, client| async move {
            let mut contract = token_contract("44");
            contract.piping = true;
            contract.method_args = ["to".to_string()].into_iter().collect();
            let address = contract.address.clone();
            test_runner::drop_contract_schema(&client, &address).await;

            let cache = PipeCache::new();
            cache.publish(&address, "Transfer", vec![piped_transfer(700)]).await;

            let mut poller = poller_with(
                StubProvider::default().with_call_result(encoded_uint(5)),
                pool,
                cache,
            );
            poller.poll_contract_at(&contract, 700).await.unwrap();
            poller.poll_contract_at(&contract, 700).await.unwrap();

            let rows: Vec<Value> = PostgresRepo::load_data_list(
                &client,
                &format!("SELECT * FROM {}", method_table_name(&address, "balanceOf")),
            )
            .await
            .unwrap();

            assert_eq!(rows.len(), 1);
        })
        .await;
    }
}
