#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use contractwatch::{
        checked_column_id, qualified_table_name, LoadsDataWithRawQuery, PostgresRepo, Transformer,
    };
    use ethers::types::FilterBlockOption;
    use serde_json::Value;

    use crate::factory::{
        create_header, empty_provider, piping_token_entry, test_contract_address, token_entry,
        transfer_log, undecodable_transfer_log, watch_config, StubProvider, FROM_ADDRESS,
        TO_ADDRESS,
    };
    use crate::{provider_with_filter_stubber, test_runner};

    #[tokio::test]
    async fn leaves_the_cursor_alone_for_an_empty_header_range() {
        test_runner::run_test(|pool, client| async move {
            let config = watch_config(token_entry("01", 100));
            let mut transformer = Transformer::new(config, Arc::new(empty_provider()), pool);

            transformer.init().await.unwrap();
            assert_eq!(transformer.start, 100);

            transformer.execute().await.unwrap();

            assert_eq!(transformer.start, 100);
            let checked: Vec<Value> =
                PostgresRepo::load_data_list(&client, "SELECT * FROM checked_headers")
                    .await
                    .unwrap();
            assert!(checked.is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn executing_without_initialized_contracts_fails() {
        test_runner::run_test(|pool, _client| async move {
            let config = watch_config(token_entry("09", 0));
            let mut transformer = Transformer::new(config, Arc::new(empty_provider()), pool);

            assert!(transformer.execute().await.is_err());
        })
        .await;
    }

    #[tokio::test]
    async fn marks_a_no_match_header_checked_and_advances() {
        test_runner::run_test(|pool, client| async move {
            let header = create_header(&client, 150).await;

            let config = watch_config(token_entry("02", 150));
            let mut transformer = Transformer::new(config, Arc::new(empty_provider()), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            let column = checked_column_id("Transfer", &test_contract_address("02"));
            let checked: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT {column} AS checked FROM checked_headers WHERE header_id = {}",
                    header.id
                ),
            )
            .await
            .unwrap();

            assert_eq!(checked.unwrap()["checked"], Value::Bool(true));
            assert_eq!(transformer.start, 151);
        })
        .await;
    }

    #[tokio::test]
    async fn persists_a_converted_event_row() {
        test_runner::run_test(|pool, client| async move {
            let address = test_contract_address("03");
            test_runner::drop_contract_schema(&client, &address).await;
            let header = create_header(&client, 200).await;

            let provider = StubProvider::default()
                .with_logs_at(200, vec![transfer_log(&address, 200, 1661)]);
            let config = watch_config(token_entry("03", 200));
            let mut transformer = Transformer::new(config, Arc::new(provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            let table = qualified_table_name(&address, "Transfer");
            let row: Option<Value> =
                PostgresRepo::load_data(&client, &format!("SELECT * FROM {table}"))
                    .await
                    .unwrap();
            let row = row.unwrap();

            assert_eq!(row["header_id"].as_i64(), Some(header.id));
            assert_eq!(row["tx_idx"].as_i64(), Some(89));
            assert_eq!(row["log_idx"].as_i64(), Some(218));
            assert_eq!(row["from_"], Value::String(FROM_ADDRESS.to_string()));
            assert_eq!(row["to_"], Value::String(TO_ADDRESS.to_string()));
            assert_eq!(row["value_"].as_i64(), Some(1661));
            assert!(row["raw_log"].as_str().unwrap().starts_with("\\x"));

            let column = checked_column_id("Transfer", &address);
            let checked: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT {column} AS checked FROM checked_headers WHERE header_id = {}",
                    header.id
                ),
            )
            .await
            .unwrap();
            assert_eq!(checked.unwrap()["checked"], Value::Bool(true));
            assert_eq!(transformer.start, 201);
        })
        .await;
    }

    #[tokio::test]
    async fn pipes_event_arguments_into_method_polling() {
        test_runner::run_test(|pool, client| async move {
            let address = test_contract_address("04");
            test_runner::drop_contract_schema(&client, &address).await;
            create_header(&client, 210).await;

            let provider = StubProvider::default()
                .with_logs_at(210, vec![transfer_log(&address, 210, 42)])
                .with_call_result(crate::factory::encoded_uint(1337));
            let config = watch_config(piping_token_entry("04", 210));
            let mut transformer = Transformer::new(config, Arc::new(provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            let table = contractwatch::method_table_name(&address, "balanceOf");
            let row: Option<Value> =
                PostgresRepo::load_data(&client, &format!("SELECT * FROM {table}"))
                    .await
                    .unwrap();
            let row = row.unwrap();

            assert_eq!(row["block"].as_i64(), Some(210));
            assert_eq!(row["who_"], Value::String(TO_ADDRESS.to_string()));
            assert_eq!(row["returned"].as_i64(), Some(1337));
        })
        .await;
    }

    #[tokio::test]
    async fn replaying_a_processed_range_changes_nothing() {
        test_runner::run_test(|pool, client| async move {
            let address = test_contract_address("05");
            test_runner::drop_contract_schema(&client, &address).await;
            create_header(&client, 220).await;

            let provider = StubProvider::default()
                .with_logs_at(220, vec![transfer_log(&address, 220, 7)]);
            let config = watch_config(token_entry("05", 220));
            let mut transformer = Transformer::new(config, Arc::new(provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();
            transformer.execute().await.unwrap();

            let table = qualified_table_name(&address, "Transfer");
            let rows: Vec<Value> =
                PostgresRepo::load_data_list(&client, &format!("SELECT * FROM {table}"))
                    .await
                    .unwrap();

            assert_eq!(rows.len(), 1);
            assert_eq!(transformer.start, 221);
        })
        .await;
    }

    #[tokio::test]
    async fn a_failed_header_is_retried_to_the_same_final_state() {
        test_runner::run_test(|pool, client| async move {
            let address = test_contract_address("06");
            test_runner::drop_contract_schema(&client, &address).await;
            let header = create_header(&client, 230).await;

            let bad_provider = StubProvider::default()
                .with_logs_at(230, vec![undecodable_transfer_log(&address, 230)]);
            let config = watch_config(token_entry("06", 230));
            let mut transformer =
                Transformer::new(config.clone(), Arc::new(bad_provider), pool.clone());

            transformer.init().await.unwrap();
            assert!(transformer.execute().await.is_err());
            assert_eq!(transformer.start, 230);

            let checked: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT * FROM checked_headers WHERE header_id = {}",
                    header.id
                ),
            )
            .await
            .unwrap();
            assert!(checked.is_none());

            let good_provider = StubProvider::default()
                .with_logs_at(230, vec![transfer_log(&address, 230, 9)]);
            let mut transformer = Transformer::new(config, Arc::new(good_provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            let table = qualified_table_name(&address, "Transfer");
            let rows: Vec<Value> =
                PostgresRepo::load_data_list(&client, &format!("SELECT * FROM {table}"))
                    .await
                    .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(transformer.start, 231);
        })
        .await;
    }

    #[tokio::test]
    async fn fetches_logs_by_the_headers_block_hash() {
        test_runner::run_test(|pool, client| async move {
            create_header(&client, 240).await;

            let provider = provider_with_filter_stubber!(|filter: &ethers::types::Filter| {
                match filter.block_option {
                    FilterBlockOption::AtBlockHash(hash) => {
                        assert_eq!(
                            hash,
                            crate::factory::header_hash(240).parse().unwrap()
                        );
                    }
                    FilterBlockOption::Range { .. } => panic!("expected a block hash filter"),
                }
                assert!(filter.address.is_some());
            });
            let config = watch_config(token_entry("07", 240));
            let mut transformer = Transformer::new(config, Arc::new(provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            assert_eq!(transformer.start, 241);
        })
        .await;
    }

    #[tokio::test]
    async fn polls_zero_argument_methods_on_quiet_headers() {
        test_runner::run_test(|pool, client| async move {
            let address = test_contract_address("08");
            test_runner::drop_contract_schema(&client, &address).await;
            create_header(&client, 250).await;

            let provider = StubProvider::default()
                .with_call_result(crate::factory::encoded_string("TestToken"));
            let entry = token_entry("08", 250).add_method("name");
            let config = watch_config(entry);
            let mut transformer = Transformer::new(config, Arc::new(provider), pool);

            transformer.init().await.unwrap();
            transformer.execute().await.unwrap();

            let table = contractwatch::method_table_name(&address, "name");
            let row: Option<Value> =
                PostgresRepo::load_data(&client, &format!("SELECT * FROM {table}"))
                    .await
                    .unwrap();
            let row = row.unwrap();

            assert_eq!(row["block"].as_i64(), Some(250));
            assert_eq!(row["returned"], Value::String("TestToken".to_string()));
            assert_eq!(row["token_name"], Value::String("TestToken".to_string()));

            let column = checked_column_id("name", &address);
            let checked: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!("SELECT {column} AS checked FROM checked_headers"),
            )
            .await
            .unwrap();
            assert_eq!(checked.unwrap()["checked"], Value::Bool(true));
        })
        .await;
    }
}
