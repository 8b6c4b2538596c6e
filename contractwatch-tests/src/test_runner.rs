use std::future::Future;
use std::sync::OnceLock;

use contractwatch::{
    ExecutesWithRawQuery, HasRawQueryClient, Migratable, Pool, PostgresRepo, PostgresRepoClient,
    RepoMigrations,
};
use tokio::sync::Mutex;

use crate::db;

// Tests share one database; they take turns on it.
static DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn new_repo() -> PostgresRepo {
    PostgresRepo::new(db::database_url().as_str())
}

pub async fn get_pool() -> Pool {
    new_repo().get_pool(5).await.unwrap()
}

/// Ensures the base tables exist, clears the headers ingested by previous
/// tests and hands the test a connection pool plus a raw client.
pub async fn run_test<TestFn, Fut>(test_fn: TestFn)
where
    TestFn: Fn(Pool, PostgresRepoClient) -> Fut,
    Fut: Future<Output = ()>,
{
    let _guard = DB_LOCK.get_or_init(|| Mutex::new(())).lock().await;

    db::setup().await;

    let repo = new_repo();
    let client = repo.get_client().await.unwrap();

    create_headers_table(&client).await;
    PostgresRepo::migrate(&client, PostgresRepo::get_internal_migrations()).await.unwrap();

    // Cascades into checked_headers rows; dynamically added columns remain.
    PostgresRepo::execute(&client, "DELETE FROM headers").await.unwrap();

    let pool = repo.get_pool(5).await.unwrap();

    test_fn(pool, client).await;
}

/// The watcher treats `headers` as externally owned; tests play the
/// header-sync role.
pub async fn create_headers_table(client: &PostgresRepoClient) {
    PostgresRepo::execute(
        client,
        "CREATE TABLE IF NOT EXISTS headers (
            id SERIAL PRIMARY KEY,
            hash CHARACTER VARYING(66) NOT NULL,
            block_number BIGINT NOT NULL
        )",
    )
    .await
    .unwrap();
}

/// Drops a contract's event and method tables so a test starts from a clean
/// slate for its own address.
pub async fn drop_contract_schema(client: &PostgresRepoClient, address: &str) {
    PostgresRepo::execute(
        client,
        &format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            contractwatch::schema_name(address)
        ),
    )
    .await
    .unwrap();
}
