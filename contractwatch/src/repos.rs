mod postgres_repo;
mod repo;

pub use postgres_repo::{Conn, Pool, PostgresRepo, PostgresRepoClient};
pub use repo::{
    ExecutesWithRawQuery, HasRawQueryClient, LoadsDataWithRawQuery, Migratable, RepoError,
    RepoMigrations, SQLikeMigrations,
};
