pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::SQLError;
pub use sqlite::{SqliteStore, SqliteTransaction};
pub use traits::{with_savepoint, Executor, Row, SQLStore, SQLTransaction, Value};
