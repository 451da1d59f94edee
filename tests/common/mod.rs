//! Shared test fixtures: a recording in-memory driver and sample entities.

#![allow(dead_code)]

use db_access::db::{Command, Connection, Driver, Entity, Field, Row};
use db_access::error::{DbError, DbResult};
use db_access::models::{IsolationLevel, Provider, Value};
use db_access::{field, sql_enum};
use parking_lot::Mutex;
use std::sync::Arc;

/// A driver call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    Open,
    Close,
    Begin(IsolationLevel),
    Commit,
    Rollback,
    Execute(Command),
    Scalar(Command),
    Query(Command),
}

/// Scripted driver behavior.
#[derive(Debug, Default)]
pub struct Script {
    pub fail_execute: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub scalar: Option<Value>,
    pub rows: Vec<Row>,
    pub affected: u64,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    script: Script,
}

/// Shared log of driver calls.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<State>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, configure: impl FnOnce(&mut Script)) {
        configure(&mut self.0.lock().script);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().events.clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().events.iter().filter(|e| matches(e)).count()
    }

    pub fn clear(&self) {
        self.0.lock().events.clear();
    }

    /// Commands sent through `execute`, in order.
    pub fn executed(&self) -> Vec<Command> {
        self.0
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.0.lock().events.push(event);
    }
}

fn scripted_failure(what: &str) -> DbError {
    DbError::database(format!("scripted {} failure", what), None, "none")
}

pub struct MockConnection {
    recorder: Recorder,
    provider: Provider,
    open: bool,
}

impl MockConnection {
    pub fn new(recorder: &Recorder, provider: Provider, open: bool) -> Self {
        Self {
            recorder: recorder.clone(),
            provider,
            open,
        }
    }
}

impl Connection for MockConnection {
    fn supports(&self, provider: Provider) -> bool {
        provider == self.provider
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> DbResult<()> {
        self.recorder.record(Event::Open);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        self.recorder.record(Event::Close);
        self.open = false;
        Ok(())
    }

    fn begin(&mut self, isolation: IsolationLevel) -> DbResult<()> {
        self.recorder.record(Event::Begin(isolation));
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.recorder.record(Event::Commit);
        if self.recorder.0.lock().script.fail_commit {
            return Err(scripted_failure("commit"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.recorder.record(Event::Rollback);
        if self.recorder.0.lock().script.fail_rollback {
            return Err(scripted_failure("rollback"));
        }
        Ok(())
    }

    fn execute(&mut self, command: &Command) -> DbResult<u64> {
        self.recorder.record(Event::Execute(command.clone()));
        let state = self.recorder.0.lock();
        if state.script.fail_execute {
            return Err(scripted_failure("execute"));
        }
        Ok(state.script.affected)
    }

    fn query_scalar(&mut self, command: &Command) -> DbResult<Value> {
        self.recorder.record(Event::Scalar(command.clone()));
        Ok(self
            .recorder
            .0
            .lock()
            .script
            .scalar
            .clone()
            .unwrap_or(Value::Null))
    }

    fn query(
        &mut self,
        command: &Command,
        sink: &mut dyn FnMut(&Row) -> DbResult<bool>,
    ) -> DbResult<()> {
        self.recorder.record(Event::Query(command.clone()));
        let rows = self.recorder.0.lock().script.rows.clone();
        for row in &rows {
            if !sink(row)? {
                break;
            }
        }
        Ok(())
    }
}

/// Driver handing out [`MockConnection`]s that share one recorder.
pub struct MockDriver {
    recorder: Recorder,
    provider: Provider,
}

impl MockDriver {
    pub fn new(recorder: &Recorder, provider: Provider) -> Arc<Self> {
        Arc::new(Self {
            recorder: recorder.clone(),
            provider,
        })
    }
}

impl Driver for MockDriver {
    fn supports(&self, provider: Provider) -> bool {
        provider == self.provider
    }

    fn connect(&self, _connection_string: &str) -> DbResult<Box<dyn Connection>> {
        self.recorder.record(Event::Connect);
        let mut conn = MockConnection::new(&self.recorder, self.provider, false);
        conn.open()?;
        Ok(Box::new(conn))
    }
}

pub fn row(columns: &[&str], values: Vec<Value>) -> Row {
    let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    Row::new(Arc::from(columns), values)
}

// =============================================================================
// Sample entities
// =============================================================================

sql_enum! {
    #[derive(Default)]
    pub enum Priority {
        #[default]
        Low,
        Normal,
        Urgent,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub done: bool,
    pub priority: Priority,
    pub estimate: Option<f64>,
    /// Not registered: the engine never reads or writes it.
    pub note: String,
}

impl Entity for Task {
    fn fields() -> &'static [Field<Self>] {
        static FIELDS: &[Field<Task>] = &[
            field!(Task, id: i64, default = 0i64)
                .column("TaskId")
                .read_only()
                .key(),
            field!(Task, title: String, default = ""),
            field!(Task, done: bool, default = false),
            field!(Task, priority: Priority, default = Priority::Normal),
            field!(Task, estimate: Option<f64>, default = None::<f64>),
        ];
        FIELDS
    }
}

impl Task {
    pub fn new(title: &str, priority: Priority) -> Self {
        Self {
            title: title.to_string(),
            priority,
            ..Self::default()
        }
    }
}
