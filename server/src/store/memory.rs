//! In-process store that understands the statement [`catalog`](super::catalog).
//!
//! All tables live behind one async mutex. Single statements lock it for
//! their own duration; a transaction holds it until commit or drop, and a
//! dropped transaction restores the snapshot taken when it began. That gives
//! the same guarantees the engine relies on from `PostgreSQL`: the
//! conditional redeem is atomic and transactions are all-or-nothing.
//!
//! It ships in the library rather than behind `cfg(test)` because the
//! integration tests under `tests/` and local demos link against the public
//! crate, and they need a store with no database behind it. The service
//! binary never constructs one: every store operation, not just every
//! transaction, serialises on the single lock, so it is unsuitable for
//! serving traffic. [`MemoryStore::fail_statement`] exists only to drive
//! failure paths in tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::catalog;
use super::{Cell, Param, Row, StatementSet, Store, StoreError, StoreTransaction};
use crate::identity;
use crate::time_window::{format_timestamp, parse_timestamp};

#[derive(Debug, Clone)]
struct Account {
    id: String,
    username: String,
    password: String,
}

#[derive(Debug, Clone)]
struct EventRecord {
    name: String,
    venue: String,
    optional_details: Option<String>,
    organization_id: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TicketRecord {
    event_id: String,
    holder_name: String,
    status: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    organizations: Vec<Account>,
    staff: Vec<Account>,
    events: HashMap<String, EventRecord>,
    tickets: HashMap<String, TicketRecord>,
}

#[derive(Default)]
struct Outcome {
    rows: Vec<Row>,
    affected: u64,
}

impl Outcome {
    fn rows(rows: Vec<Row>) -> Self {
        let affected = rows.len() as u64;
        Self { rows, affected }
    }

    fn affected(affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            affected,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    statements: Arc<StatementSet>,
    tables: Arc<Mutex<Tables>>,
    faults: Arc<StdMutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an organization account and returns its id.
    pub async fn add_organization(&self, username: &str, password: &str) -> String {
        let account = Account {
            id: identity::generate(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let id = account.id.clone();
        self.tables.lock().await.organizations.push(account);
        id
    }

    /// Adds a gate staff account and returns its id.
    pub async fn add_staff(&self, username: &str, password: &str) -> String {
        let account = Account {
            id: identity::generate(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let id = account.id.clone();
        self.tables.lock().await.staff.push(account);
        id
    }

    /// Removes an event row, leaving its tickets in place.
    pub async fn delete_event(&self, event_id: &str) -> bool {
        self.tables.lock().await.events.remove(event_id).is_some()
    }

    pub async fn event_count(&self) -> usize {
        self.tables.lock().await.events.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.tables.lock().await.tickets.len()
    }

    /// Stored (not effective) status of a ticket.
    pub async fn ticket_status(&self, ticket_id: &str) -> Option<String> {
        self.tables
            .lock()
            .await
            .tickets
            .get(ticket_id)
            .map(|t| t.status.clone())
    }

    /// Makes every later execution of `statement` fail.
    pub fn fail_statement(&self, statement: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(statement.to_string());
        }
    }

    fn check_fault(faults: &StdMutex<HashSet<String>>, name: &str) -> Result<(), StoreError> {
        let failing = faults.lock().map(|f| f.contains(name)).unwrap_or(false);
        if failing {
            return Err(StoreError::ExecFailed(format!("injected failure in {name}")));
        }
        Ok(())
    }
}

fn arg<'a>(params: &'a [Param<'_>], index: usize) -> Result<&'a str, StoreError> {
    params
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| StoreError::ExecFailed(format!("null value for parameter ${}", index + 1)))
}

fn timestamp_arg(params: &[Param<'_>], index: usize) -> Result<DateTime<Utc>, StoreError> {
    let value = arg(params, index)?;
    parse_timestamp(value).map_err(|_| {
        StoreError::ExecFailed(format!("invalid input syntax for type timestamp: \"{value}\""))
    })
}

fn uuid_arg<'a>(params: &'a [Param<'_>], index: usize) -> Result<&'a str, StoreError> {
    let value = arg(params, index)?;
    if !identity::is_well_formed(value) {
        return Err(StoreError::ExecFailed(format!(
            "invalid input syntax for type uuid: \"{value}\""
        )));
    }
    Ok(value)
}

/// `timestamptz::text` as `PostgreSQL` renders it in a UTC session.
fn timestamptz_text(instant: DateTime<Utc>) -> Cell {
    Cell::Text(format!("{}+00", format_timestamp(instant)))
}

fn verify(accounts: &[Account], params: &[Param<'_>]) -> Result<Outcome, StoreError> {
    let username = arg(params, 0)?;
    let password = arg(params, 1)?;
    Ok(Outcome::rows(
        accounts
            .iter()
            .filter(|a| a.username == username && a.password == password)
            .map(|a| Row::new(vec![Cell::from(a.id.as_str())]))
            .collect(),
    ))
}

fn execute(tables: &mut Tables, name: &str, params: &[Param<'_>]) -> Result<Outcome, StoreError> {
    match name {
        catalog::VERIFY_ORGANIZATION => verify(&tables.organizations, params),
        catalog::VERIFY_STAFF => verify(&tables.staff, params),
        catalog::INSERT_EVENT => {
            let id = uuid_arg(params, 0)?;
            let organization_id = uuid_arg(params, 4)?;
            if tables.events.contains_key(id) {
                return Err(StoreError::ExecFailed(
                    "duplicate key value violates unique constraint \"events_pkey\"".to_string(),
                ));
            }
            if !tables.organizations.iter().any(|o| o.id == organization_id) {
                return Err(StoreError::ExecFailed(
                    "insert or update on table \"events\" violates foreign key constraint"
                        .to_string(),
                ));
            }
            let record = EventRecord {
                name: arg(params, 1)?.to_string(),
                venue: arg(params, 2)?.to_string(),
                optional_details: params[3].map(str::to_string),
                organization_id: organization_id.to_string(),
                starts_at: timestamp_arg(params, 5)?,
                ends_at: timestamp_arg(params, 6)?,
                expires_at: timestamp_arg(params, 7)?,
            };
            tables.events.insert(id.to_string(), record);
            Ok(Outcome::affected(1))
        }
        catalog::SELECT_OWNED_EVENT => {
            let id = uuid_arg(params, 0)?;
            let organization_id = uuid_arg(params, 1)?;
            Ok(Outcome::rows(
                tables
                    .events
                    .get(id)
                    .filter(|e| e.organization_id == organization_id)
                    .map(|e| {
                        Row::new(vec![
                            Cell::from(e.name.as_str()),
                            Cell::from(e.venue.as_str()),
                            Cell::from(e.optional_details.clone()),
                            timestamptz_text(e.starts_at),
                            timestamptz_text(e.ends_at),
                            timestamptz_text(e.expires_at),
                        ])
                    })
                    .into_iter()
                    .collect(),
            ))
        }
        catalog::INSERT_TICKET => {
            let id = uuid_arg(params, 0)?;
            if tables.tickets.contains_key(id) {
                return Err(StoreError::ExecFailed(
                    "duplicate key value violates unique constraint \"tickets_pkey\"".to_string(),
                ));
            }
            let record = TicketRecord {
                event_id: uuid_arg(params, 1)?.to_string(),
                holder_name: arg(params, 2)?.to_string(),
                status: "active".to_string(),
                expires_at: timestamp_arg(params, 3)?,
            };
            tables.tickets.insert(id.to_string(), record);
            Ok(Outcome::affected(1))
        }
        catalog::REDEEM_TICKET => {
            let id = uuid_arg(params, 0)?;
            let event_id = uuid_arg(params, 1)?;
            let now = timestamp_arg(params, 2)?;
            let event_exists = tables.events.contains_key(event_id);

            let redeemed = tables
                .tickets
                .get_mut(id)
                .filter(|t| {
                    event_exists
                        && t.event_id == event_id
                        && t.status == "active"
                        && t.expires_at >= now
                })
                .map(|t| {
                    t.status = "redeemed".to_string();
                    Row::new(vec![Cell::from(t.holder_name.as_str())])
                });
            Ok(Outcome::rows(redeemed.into_iter().collect()))
        }
        catalog::SELECT_TICKET_STATE => {
            let id = uuid_arg(params, 0)?;
            let event_id = uuid_arg(params, 1)?;
            let event_exists = tables.events.contains_key(event_id);
            Ok(Outcome::rows(
                tables
                    .tickets
                    .get(id)
                    .filter(|t| event_exists && t.event_id == event_id)
                    .map(|t| {
                        Row::new(vec![
                            Cell::from(t.status.as_str()),
                            timestamptz_text(t.expires_at),
                        ])
                    })
                    .into_iter()
                    .collect(),
            ))
        }
        other => Err(StoreError::UnknownStatement(other.to_string())),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn prepare(&mut self, name: &str, sql: &str, arity: usize) -> Result<(), StoreError> {
        if !catalog::STATEMENTS.iter().any(|s| s.name == name) {
            return Err(StoreError::PrepareFailed {
                name: name.to_string(),
                message: "statement is not part of the catalog".to_string(),
            });
        }
        Arc::make_mut(&mut self.statements).insert(name, sql, arity);
        Ok(())
    }

    async fn exec_prepared(
        &self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        self.statements.resolve(name, params)?;
        Self::check_fault(&self.faults, name)?;
        let mut tables = self.tables.lock().await;
        execute(&mut tables, name, params).map(|o| o.rows)
    }

    async fn exec_prepared_command(
        &self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError> {
        self.statements.resolve(name, params)?;
        Self::check_fault(&self.faults, name)?;
        let mut tables = self.tables.lock().await;
        execute(&mut tables, name, params).map(|o| o.affected)
    }

    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tables = Arc::clone(&self.tables).lock_owned().await;
        let snapshot = Some(tables.clone());
        Ok(Box::new(MemoryTransaction {
            tables,
            snapshot,
            statements: Arc::clone(&self.statements),
            faults: Arc::clone(&self.faults),
        }))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct MemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    /// State at `BEGIN`; `None` once committed.
    snapshot: Option<Tables>,
    statements: Arc<StatementSet>,
    faults: Arc<StdMutex<HashSet<String>>>,
}

impl MemoryTransaction {
    fn run(&mut self, name: &str, params: &[Param<'_>]) -> Result<Outcome, StoreError> {
        self.statements.resolve(name, params)?;
        MemoryStore::check_fault(&self.faults, name)?;
        execute(&mut self.tables, name, params)
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.tables = snapshot;
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn exec_prepared(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        self.run(name, params).map(|o| o.rows)
    }

    async fn exec_prepared_command(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError> {
        self.run(name, params).map(|o| o.affected)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}
