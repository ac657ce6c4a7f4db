//! Database connections for filtered queries.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Connection options for `url`.
///
/// SQLite has no built-in `REGEXP` function, so one backed by the `regex`
/// crate is registered on every pooled SQLite connection. Postgres and MySQL
/// evaluate the `regexp` operators natively.
#[must_use]
pub fn connect_options(url: impl Into<String>) -> ConnectOptions {
    #[cfg_attr(not(feature = "sqlite"), allow(unused_mut))]
    let mut options = ConnectOptions::new(url);
    #[cfg(feature = "sqlite")]
    options.map_sqlx_sqlite_opts(|sqlite| sqlite.with_regexp());
    options
}

/// Connect to `url` with [`connect_options`].
///
/// # Errors
///
/// `DbErr::Conn` when the database cannot be reached.
pub async fn connect(url: impl Into<String>) -> Result<DatabaseConnection, DbErr> {
    Database::connect(connect_options(url)).await
}
