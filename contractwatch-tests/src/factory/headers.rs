use contractwatch::{Header, LoadsDataWithRawQuery, PostgresRepo, PostgresRepoClient};

pub fn header_hash(block_number: i64) -> String {
    format!("0x{:064x}", block_number)
}

/// Plays the header-sync role: inserts one canonical header and returns it.
pub async fn create_header(client: &PostgresRepoClient, block_number: i64) -> Header {
    let header: Option<Header> = PostgresRepo::load_data(
        client,
        &format!(
            "INSERT INTO headers (hash, block_number)
            VALUES ('{}', {block_number})
            RETURNING id, block_number, hash",
            header_hash(block_number)
        ),
    )
    .await
    .unwrap();

    header.unwrap()
}
