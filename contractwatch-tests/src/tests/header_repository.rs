#[cfg(test)]
mod tests {
    use contractwatch::{
        checked_column_id, HeaderRepository, LoadsDataWithRawQuery, PostgresRepo,
    };
    use serde_json::Value;

    use crate::factory::{create_header, test_contract_address};
    use crate::test_runner;

    fn column(name: &str, nonce: &str) -> String {
        checked_column_id(name, &test_contract_address(nonce))
    }

    #[tokio::test]
    async fn adding_a_check_column_twice_is_a_no_op() {
        test_runner::run_test(|pool, client| async move {
            let mut repository = HeaderRepository::new(pool);
            let column = column("Transfer", "20");

            repository.add_check_column(&column).await.unwrap();
            repository.add_check_column(&column).await.unwrap();

            let found: Option<Value> = PostgresRepo::load_data(
                &client,
                &format!(
                    "SELECT column_name FROM information_schema.columns
                    WHERE table_name = 'checked_headers' AND column_name = '{column}'"
                ),
            )
            .await
            .unwrap();

            assert!(found.is_some());
        })
        .await;
    }

    #[tokio::test]
    async fn returns_headers_missing_any_of_the_given_columns() {
        test_runner::run_test(|pool, client| async move {
            let header_one = create_header(&client, 301).await;
            let header_two = create_header(&client, 302).await;
            let header_three = create_header(&client, 303).await;

            let mut repository = HeaderRepository::new(pool);
            let transfer = column("Transfer", "21");
            let approval = column("Approval", "21");
            repository.add_check_column(&transfer).await.unwrap();
            repository.add_check_column(&approval).await.unwrap();

            repository
                .mark_header_checked_for_all(header_two.id, &[transfer.clone(), approval.clone()])
                .await
                .unwrap();

            let missing = repository
                .missing_headers_for_all(301, -1, &[transfer.clone(), approval.clone()])
                .await
                .unwrap();
            assert_eq!(missing, vec![header_one.clone(), header_three.clone()]);

            // One column checked is not enough.
            repository
                .mark_header_checked(header_three.id, &transfer)
                .await
                .unwrap();
            let missing = repository
                .missing_headers_for_all(301, -1, &[transfer.clone(), approval.clone()])
                .await
                .unwrap();
            assert_eq!(missing, vec![header_one.clone(), header_three]);

            let missing = repository
                .missing_headers_for_all(301, 301, &[transfer, approval])
                .await
                .unwrap();
            assert_eq!(missing, vec![header_one]);
        })
        .await;
    }

    #[tokio::test]
    async fn marking_checked_is_idempotent() {
        test_runner::run_test(|pool, client| async move {
            let header = create_header(&client, 310).await;

            let mut repository = HeaderRepository::new(pool);
            let transfer = column("Transfer", "22");
            repository.add_check_column(&transfer).await.unwrap();

            repository
                .mark_header_checked_for_all(header.id, &[transfer.clone()])
                .await
                .unwrap();
            repository
                .mark_header_checked_for_all(header.id, &[transfer.clone()])
                .await
                .unwrap();

            let rows: Vec<Value> = PostgresRepo::load_data_list(
                &client,
                &format!(
                    "SELECT {transfer} AS checked FROM checked_headers WHERE header_id = {}",
                    header.id
                ),
            )
            .await
            .unwrap();

            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["checked"], Value::Bool(true));
        })
        .await;
    }

    #[tokio::test]
    async fn missing_headers_are_empty_without_watched_columns() {
        test_runner::run_test(|pool, client| async move {
            create_header(&client, 320).await;

            let repository = HeaderRepository::new(pool);
            let missing = repository.missing_headers_for_all(0, -1, &[]).await.unwrap();

            assert!(missing.is_empty());
        })
        .await;
    }
}
