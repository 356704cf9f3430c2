use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Text value, or NULL when absent.
    pub fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// A row returned from a SQL query — column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name. NULL reads as `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an owned text column value by name.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_str(name).map(String::from)
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }
}

/// Statement execution shared by stores and open transactions.
pub trait Executor {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;
}

/// An open write transaction.
///
/// Dropping the handle without calling [`SQLTransaction::commit`] rolls
/// every statement back.
pub trait SQLTransaction: Executor {
    fn commit(self: Box<Self>) -> Result<(), SQLError>;
}

/// SQLStore provides a SQL execution interface backed by an embedded database.
///
/// While a transaction obtained from [`SQLStore::begin`] is alive, statements
/// must go through the transaction handle, not through the store.
pub trait SQLStore: Executor + Send + Sync {
    /// Open a serializable write transaction.
    fn begin(&self) -> Result<Box<dyn SQLTransaction + '_>, SQLError>;
}

/// Run `f` as a nested step of an open transaction. On `Err` only the
/// statements issued by `f` are undone; the transaction stays usable.
pub fn with_savepoint<T, E>(
    tx: &dyn SQLTransaction,
    name: &str,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<SQLError>,
{
    tx.exec(&format!("SAVEPOINT {name}"), &[])?;
    match f() {
        Ok(value) => {
            tx.exec(&format!("RELEASE {name}"), &[])?;
            Ok(value)
        }
        Err(e) => {
            tx.exec(&format!("ROLLBACK TO {name}"), &[])?;
            tx.exec(&format!("RELEASE {name}"), &[])?;
            Err(e)
        }
    }
}
