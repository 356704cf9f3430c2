//! Row access for the SIM and client tables.
//!
//! Every function takes any [`Executor`], so the engine runs them on an
//! open transaction and read paths run them on the store. The binding
//! writers (`bind_sim`, `unbind_sim`, `set_held_serial`) are only called
//! from the assignment engine.

use salesops_core::{new_id, now_rfc3339};
use salesops_sql::{Executor, Row, SQLError, Value};

use crate::model::{ActivityEntry, Client, SimCard, SimStatus};

const SIM_COLUMNS: &str =
    "id, serial, status, owner_client_id, scope, assigned_at, activated_at, created_at";
const CLIENT_COLUMNS: &str =
    "id, display_name, product_class, held_sim_serial, scope, created_at, deleted_at";

// ── SIM cards ──

pub(crate) fn load_sim<E: Executor + ?Sized>(db: &E, id: &str) -> Result<Option<SimCard>, SQLError> {
    let sql = format!("SELECT {SIM_COLUMNS} FROM sim_cards WHERE id = ?1");
    first_sim(db.query(&sql, &[Value::from(id)])?)
}

pub(crate) fn load_sim_by_serial<E: Executor + ?Sized>(
    db: &E,
    serial: &str,
) -> Result<Option<SimCard>, SQLError> {
    let sql = format!("SELECT {SIM_COLUMNS} FROM sim_cards WHERE serial = ?1");
    first_sim(db.query(&sql, &[Value::from(serial)])?)
}

/// The card whose owner column points at the client.
pub(crate) fn load_sim_owned_by<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
) -> Result<Option<SimCard>, SQLError> {
    let sql = format!("SELECT {SIM_COLUMNS} FROM sim_cards WHERE owner_client_id = ?1");
    first_sim(db.query(&sql, &[Value::from(client_id)])?)
}

/// Lowest-serial AVAILABLE card of a scope.
pub(crate) fn first_available<E: Executor + ?Sized>(
    db: &E,
    scope: &str,
) -> Result<Option<SimCard>, SQLError> {
    let sql = format!(
        "SELECT {SIM_COLUMNS} FROM sim_cards \
         WHERE scope = ?1 AND status = ?2 ORDER BY serial ASC LIMIT 1"
    );
    first_sim(db.query(
        &sql,
        &[Value::from(scope), Value::from(SimStatus::Available.as_str())],
    )?)
}

/// AVAILABLE cards of a scope, plus the card with `include_serial`
/// whatever its status, ordered by serial.
pub(crate) fn pool<E: Executor + ?Sized>(
    db: &E,
    scope: &str,
    include_serial: Option<&str>,
) -> Result<Vec<SimCard>, SQLError> {
    // `serial = NULL` never matches, so a missing include_serial drops out.
    let sql = format!(
        "SELECT {SIM_COLUMNS} FROM sim_cards \
         WHERE scope = ?1 AND (status = ?2 OR serial = ?3) ORDER BY serial ASC"
    );
    db.query(
        &sql,
        &[
            Value::from(scope),
            Value::from(SimStatus::Available.as_str()),
            Value::opt_text(include_serial),
        ],
    )?
    .iter()
    .map(row_to_sim)
    .collect()
}

pub(crate) fn all_sims<E: Executor + ?Sized>(db: &E) -> Result<Vec<SimCard>, SQLError> {
    let sql = format!("SELECT {SIM_COLUMNS} FROM sim_cards ORDER BY serial ASC");
    db.query(&sql, &[])?.iter().map(row_to_sim).collect()
}

pub(crate) fn insert_sim<E: Executor + ?Sized>(db: &E, sim: &SimCard) -> Result<(), SQLError> {
    db.exec(
        &format!("INSERT INTO sim_cards ({SIM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        &[
            Value::from(sim.id.as_str()),
            Value::from(sim.serial.as_str()),
            Value::from(sim.status.as_str()),
            Value::opt_text(sim.owner_client_id.as_deref()),
            Value::from(sim.scope.as_str()),
            Value::opt_text(sim.assigned_at.as_deref()),
            Value::opt_text(sim.activated_at.as_deref()),
            Value::from(sim.created_at.as_str()),
        ],
    )?;
    Ok(())
}

/// Claim an unowned AVAILABLE card for a client.
///
/// Compare-and-set: returns the number of rows changed, 0 when the card was
/// no longer free.
pub(crate) fn bind_sim<E: Executor + ?Sized>(
    db: &E,
    sim_id: &str,
    client_id: &str,
    status: SimStatus,
    assigned_at: &str,
    activated_at: Option<&str>,
) -> Result<u64, SQLError> {
    db.exec(
        "UPDATE sim_cards \
         SET status = ?1, owner_client_id = ?2, assigned_at = ?3, activated_at = ?4 \
         WHERE id = ?5 AND status = ?6 AND owner_client_id IS NULL",
        &[
            Value::from(status.as_str()),
            Value::from(client_id),
            Value::from(assigned_at),
            Value::opt_text(activated_at),
            Value::from(sim_id),
            Value::from(SimStatus::Available.as_str()),
        ],
    )
}

/// Return a card to the pool, provided its owner column still reads
/// `expected_owner` (`None` matches an unowned card).
pub(crate) fn unbind_sim<E: Executor + ?Sized>(
    db: &E,
    sim_id: &str,
    expected_owner: Option<&str>,
) -> Result<u64, SQLError> {
    db.exec(
        "UPDATE sim_cards \
         SET status = ?1, owner_client_id = NULL, assigned_at = NULL, activated_at = NULL \
         WHERE id = ?2 AND owner_client_id IS ?3",
        &[
            Value::from(SimStatus::Available.as_str()),
            Value::from(sim_id),
            Value::opt_text(expected_owner),
        ],
    )
}

// ── Clients ──

pub(crate) fn load_client<E: Executor + ?Sized>(db: &E, id: &str) -> Result<Option<Client>, SQLError> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
    db.query(&sql, &[Value::from(id)])?
        .first()
        .map(row_to_client)
        .transpose()
}

pub(crate) fn all_clients<E: Executor + ?Sized>(db: &E) -> Result<Vec<Client>, SQLError> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at ASC");
    db.query(&sql, &[])?.iter().map(row_to_client).collect()
}

pub(crate) fn insert_client<E: Executor + ?Sized>(db: &E, client: &Client) -> Result<(), SQLError> {
    db.exec(
        &format!("INSERT INTO clients ({CLIENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        &[
            Value::from(client.id.as_str()),
            Value::from(client.display_name.as_str()),
            Value::from(client.product_class.as_str()),
            Value::opt_text(client.held_sim_serial.as_deref()),
            Value::from(client.scope.as_str()),
            Value::from(client.created_at.as_str()),
            Value::opt_text(client.deleted_at.as_deref()),
        ],
    )?;
    Ok(())
}

/// Update the product classification only; binding columns are untouched.
/// Compare-and-set: only rewrites a live client still classified as
/// `expected`. Returns the affected row count.
pub(crate) fn set_product_class<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
    expected: &str,
    product_class: &str,
) -> Result<u64, SQLError> {
    db.exec(
        "UPDATE clients SET product_class = ?1 \
         WHERE id = ?2 AND product_class = ?3 AND deleted_at IS NULL",
        &[Value::from(product_class), Value::from(client_id), Value::from(expected)],
    )
}

pub(crate) fn set_held_serial<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
    serial: Option<&str>,
) -> Result<u64, SQLError> {
    db.exec(
        "UPDATE clients SET held_sim_serial = ?1 WHERE id = ?2",
        &[Value::opt_text(serial), Value::from(client_id)],
    )
}

pub(crate) fn mark_client_deleted<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
    deleted_at: &str,
) -> Result<u64, SQLError> {
    db.exec(
        "UPDATE clients SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        &[Value::from(deleted_at), Value::from(client_id)],
    )
}

// ── Activity feed ──

pub(crate) fn insert_activity<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
    actor: &str,
    message: &str,
) -> Result<(), SQLError> {
    db.exec(
        "INSERT INTO client_activity (id, client_id, actor, message, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        &[
            Value::from(new_id()),
            Value::from(client_id),
            Value::from(actor),
            Value::from(message),
            Value::from(now_rfc3339()),
        ],
    )?;
    Ok(())
}

pub(crate) fn count_activity<E: Executor + ?Sized>(db: &E, client_id: &str) -> Result<usize, SQLError> {
    let rows = db.query(
        "SELECT COUNT(*) AS cnt FROM client_activity WHERE client_id = ?1",
        &[Value::from(client_id)],
    )?;
    Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize)
}

/// Newest entries first.
pub(crate) fn list_activity<E: Executor + ?Sized>(
    db: &E,
    client_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<ActivityEntry>, SQLError> {
    let rows = db.query(
        "SELECT id, client_id, actor, message, created_at FROM client_activity \
         WHERE client_id = ?1 ORDER BY seq DESC LIMIT ?2 OFFSET ?3",
        &[
            Value::from(client_id),
            Value::Integer(limit as i64),
            Value::Integer(offset as i64),
        ],
    )?;
    rows.iter().map(row_to_activity).collect()
}

// ── Row mapping ──

fn first_sim(rows: Vec<Row>) -> Result<Option<SimCard>, SQLError> {
    rows.first().map(row_to_sim).transpose()
}

fn required(row: &Row, column: &str) -> Result<String, SQLError> {
    row.get_string(column)
        .ok_or_else(|| SQLError::Query(format!("missing column {column}")))
}

fn row_to_sim(row: &Row) -> Result<SimCard, SQLError> {
    let status_str = required(row, "status")?;
    let status = SimStatus::from_str(&status_str)
        .ok_or_else(|| SQLError::Query(format!("unknown SIM status {status_str:?}")))?;
    Ok(SimCard {
        id: required(row, "id")?,
        serial: required(row, "serial")?,
        status,
        owner_client_id: row.get_string("owner_client_id"),
        scope: required(row, "scope")?,
        assigned_at: row.get_string("assigned_at"),
        activated_at: row.get_string("activated_at"),
        created_at: required(row, "created_at")?,
    })
}

fn row_to_client(row: &Row) -> Result<Client, SQLError> {
    Ok(Client {
        id: required(row, "id")?,
        display_name: required(row, "display_name")?,
        product_class: required(row, "product_class")?,
        held_sim_serial: row.get_string("held_sim_serial"),
        scope: required(row, "scope")?,
        created_at: required(row, "created_at")?,
        deleted_at: row.get_string("deleted_at"),
    })
}

fn row_to_activity(row: &Row) -> Result<ActivityEntry, SQLError> {
    Ok(ActivityEntry {
        id: required(row, "id")?,
        client_id: required(row, "client_id")?,
        actor: required(row, "actor")?,
        message: required(row, "message")?,
        created_at: required(row, "created_at")?,
    })
}
