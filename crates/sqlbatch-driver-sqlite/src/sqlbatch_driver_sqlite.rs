//! SQLite execution service for the sqlbatch engine

mod connection;

pub use connection::{SqliteCancelHandle, SqliteConnection};
