use std::env;

use contractwatch::{HasRawQueryClient, PostgresRepo};
use dotenvy::dotenv;

pub fn database_url() -> String {
    dotenv().ok();

    env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL env variable needs to be set.")
}

/// Creates the test database when connecting to it fails.
pub async fn setup() {
    let db_url = database_url();
    let repo = PostgresRepo::new(&db_url);

    if repo.get_client().await.is_err() {
        let (db_name, db_raw_url) = get_db_name_and_raw_url(&db_url);

        let raw_repo = PostgresRepo::new(&db_raw_url);
        let raw_client = raw_repo
            .get_client()
            .await
            .unwrap_or_else(|_| panic!("Error connecting to {db_raw_url}"));

        raw_client
            .execute(format!(r#"CREATE DATABASE "{db_name}""#).as_str(), &[])
            .await
            .unwrap();
    }
}

fn get_db_name_and_raw_url(url: &str) -> (String, String) {
    let mut url_split = url.split('/').collect::<Vec<&str>>();

    let db_name = url_split
        .pop()
        .expect("DATABASE NAME needs to be specified. See: sample.env");
    let db_raw_url = url_split.join("/");

    (db_name.to_string(), db_raw_url)
}
