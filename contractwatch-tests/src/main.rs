use contractwatch::{HasRawQueryClient, Migratable, PostgresRepo, RepoMigrations};
use contractwatch_tests::{db, test_runner};

#[tokio::main]
async fn main() {
    db::setup().await;

    let repo = PostgresRepo::new(db::database_url().as_str());
    let client = repo.get_client().await.unwrap();

    test_runner::create_headers_table(&client).await;
    PostgresRepo::migrate(&client, PostgresRepo::get_internal_migrations()).await.unwrap();
}
