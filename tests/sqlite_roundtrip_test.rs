//! End-to-end behavior against a real SQLite database file.

mod common;

use common::{Priority, Task};
use db_access::db::{
    DatabaseAccess, Entity, Field, Operator, Scope, SearchParameter, SqliteDriver, field_list,
    where_clause,
};
use db_access::error::DbError;
use db_access::field;
use db_access::models::{Provider, Value};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE tasks (
    TaskId INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    done INTEGER NOT NULL DEFAULT 0,
    priority TEXT,
    estimate REAL
)";

fn open(dir: &TempDir) -> DatabaseAccess {
    let path = dir.path().join("tasks.db");
    let driver = Arc::new(SqliteDriver::new().unwrap());
    let access =
        DatabaseAccess::from_file(driver, Provider::EmbeddedFile, path.to_str().unwrap(), false)
            .unwrap();
    access.execute_non_query(Scope::Owned, SCHEMA, &[]).unwrap();
    access
}

fn select_tasks() -> String {
    format!("SELECT {} FROM tasks", field_list::<Task>(false))
}

#[test]
fn test_insert_then_query_round_trip() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let mut task = Task::new("write docs", Priority::Urgent);
    task.done = true;
    task.estimate = Some(2.5);
    task.note = "local only".into();

    let id = access.insert(Scope::Owned, "tasks", &task).unwrap();
    assert!(id > 0);

    let loaded: Vec<Task> = access
        .query(
            Scope::Owned,
            &format!("{} WHERE TaskId = @id", select_tasks()),
            &[Value::Int(id)],
        )
        .unwrap();
    assert_eq!(loaded.len(), 1);

    let expected = Task {
        id,
        note: String::new(),
        ..task
    };
    assert_eq!(loaded[0], expected);
}

#[test]
fn test_identities_increase_per_insert() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let tasks = vec![
        Task::new("one", Priority::Low),
        Task::new("two", Priority::Normal),
    ];
    let ids = access.insert_all(Scope::Owned, "tasks", &tasks).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids[1] > ids[0]);
}

#[test]
fn test_rolled_back_transaction_leaves_no_rows() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let mut tx = access.begin_transaction().unwrap();
    access
        .insert(&mut tx, "tasks", &Task::new("temporary", Priority::Low))
        .unwrap();
    let inside = access
        .execute_scalar(&mut tx, "SELECT COUNT(*) FROM tasks", &[])
        .unwrap();
    assert_eq!(inside, Value::Int(1));
    tx.rollback().unwrap();

    let after = access
        .execute_scalar(Scope::Owned, "SELECT COUNT(*) FROM tasks", &[])
        .unwrap();
    assert_eq!(after, Value::Int(0));
}

#[test]
fn test_early_stopped_reads_release_the_borrowed_transaction() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);
    access
        .insert_all(
            Scope::Owned,
            "tasks",
            &[Task::new("a", Priority::Low), Task::new("b", Priority::Low)],
        )
        .unwrap();

    let mut tx = access.begin_transaction().unwrap();
    assert!(access.exists(&mut tx, "SELECT 1 FROM tasks", &[]).unwrap());
    let first: Option<Task> = access.query_first(&mut tx, &select_tasks(), &[]).unwrap();
    assert!(first.is_some());
    let all: Vec<Task> = access.query(&mut tx, &select_tasks(), &[]).unwrap();
    assert_eq!(all.len(), 2);
    access
        .update_all(&mut tx, "UPDATE tasks SET {0} WHERE TaskId = @id", &all, |t| {
            vec![Value::Int(t.id)]
        })
        .unwrap();
    assert_eq!(access.update_by_key(&mut tx, "tasks", &all[0]).unwrap(), 1);
    access
        .execute_non_query(&mut tx, "DROP TABLE tasks", &[])
        .unwrap();
    tx.commit().unwrap();

    assert!(
        !access
            .exists(
                Scope::Owned,
                "SELECT 1 FROM sqlite_master WHERE name = 'tasks'",
                &[],
            )
            .unwrap()
    );
}

#[test]
fn test_failed_statement_rolls_back_owned_transaction() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    // The NOT NULL violation rolls back its own statement only.
    let err = access
        .insert_all(
            Scope::Owned,
            "tasks",
            &[Task::new("kept", Priority::Low)],
        )
        .and_then(|_| {
            access.execute_non_query(
                Scope::Owned,
                "INSERT INTO tasks (title) VALUES (@t)",
                &[Value::Null],
            )
        })
        .unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));

    let count = access
        .execute_scalar(Scope::Owned, "SELECT COUNT(*) FROM tasks", &[])
        .unwrap();
    assert_eq!(count, Value::Int(1));
}

#[test]
fn test_update_template() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let id = access
        .insert(Scope::Owned, "tasks", &Task::new("draft", Priority::Low))
        .unwrap();
    let mut task = Task::new("final", Priority::Urgent);
    task.done = true;

    let affected = access
        .update(
            Scope::Owned,
            "UPDATE tasks SET {0} WHERE TaskId = @id",
            &task,
            &[Value::Int(id)],
        )
        .unwrap();
    assert_eq!(affected, 1);

    let loaded: Option<Task> = access
        .query_first(
            Scope::Owned,
            &format!("{} WHERE TaskId = @id", select_tasks()),
            &[Value::Int(id)],
        )
        .unwrap();
    let loaded = loaded.unwrap();
    assert_eq!(loaded.title, "final");
    assert!(loaded.done);
    assert_eq!(loaded.priority, Priority::Urgent);
}

#[test]
fn test_update_by_key() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let id = access
        .insert(Scope::Owned, "tasks", &Task::new("draft", Priority::Low))
        .unwrap();
    let task = Task {
        id,
        title: "renamed".into(),
        ..Task::default()
    };
    assert_eq!(access.update_by_key(Scope::Owned, "tasks", &task).unwrap(), 1);

    let title = access
        .execute_scalar(
            Scope::Owned,
            "SELECT title FROM tasks WHERE TaskId = @id",
            &[Value::Int(id)],
        )
        .unwrap();
    assert_eq!(title, Value::from("renamed"));
}

#[test]
fn test_stored_enum_ordinal_and_unknown_name() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    access
        .execute_non_query(
            Scope::Owned,
            "INSERT INTO tasks (title, priority) VALUES ('by ordinal', 2), ('unknown', 'Someday'), ('missing', NULL)",
            &[],
        )
        .unwrap();

    let tasks: Vec<Task> = access
        .query(
            Scope::Owned,
            &format!("{} ORDER BY TaskId", select_tasks()),
            &[],
        )
        .unwrap();
    assert_eq!(tasks[0].priority, Priority::Urgent);
    assert_eq!(tasks[1].priority, Priority::Normal);
    assert_eq!(tasks[2].priority, Priority::Normal);
}

#[test]
fn test_predicates_against_sqlite() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);

    let mut estimated = Task::new("estimated", Priority::Normal);
    estimated.estimate = Some(3.0);
    access
        .insert_all(
            Scope::Owned,
            "tasks",
            &[
                estimated,
                Task::new("unestimated", Priority::Normal),
                Task::new("other", Priority::Low),
            ],
        )
        .unwrap();

    let (filter, values) = where_clause(
        access.dialect(),
        &[
            SearchParameter::new("priority", "p", Operator::Equal, Priority::Normal),
            SearchParameter::new("estimate", "e", Operator::Equal, Value::Null),
        ],
    )
    .unwrap();
    let tasks: Vec<Task> = access
        .query(
            Scope::Owned,
            &format!("{} WHERE {}", select_tasks(), filter),
            &values,
        )
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "unestimated");

    let (filter, values) = where_clause(
        access.dialect(),
        &[SearchParameter::new("title", "t", Operator::Like, "%estimated")],
    )
    .unwrap();
    assert!(
        access
            .exists(Scope::Owned, &format!("SELECT 1 FROM tasks WHERE {}", filter), &values)
            .unwrap()
    );
}

#[test]
fn test_null_coalesce_and_timestamp_expressions() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);
    access
        .insert(Scope::Owned, "tasks", &Task::new("no estimate", Priority::Low))
        .unwrap();

    let dialect = access.dialect();
    let sql = format!(
        "SELECT {}, {} FROM tasks",
        dialect.null_coalesce("estimate", "-1"),
        dialect.current_timestamp()
    );
    let mut seen = Vec::new();
    access
        .execute_reader(Scope::Owned, &sql, &[], |row| {
            seen.push(row.value(0).cloned());
            assert!(matches!(row.value(1), Some(Value::Text(_))));
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![Some(Value::Int(-1))]);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Device {
    serial: Uuid,
    label: Option<String>,
}

impl Entity for Device {
    fn fields() -> &'static [Field<Self>] {
        static FIELDS: &[Field<Device>] = &[
            field!(Device, serial: Uuid, default = Uuid::nil()).key(),
            field!(Device, label: Option<String>, default = None::<String>),
        ];
        FIELDS
    }
}

#[test]
fn test_uuid_round_trip_and_malformed_identifier() {
    let dir = TempDir::new().unwrap();
    let access = open(&dir);
    access
        .execute_non_query(
            Scope::Owned,
            "CREATE TABLE devices (serial TEXT PRIMARY KEY, label TEXT)",
            &[],
        )
        .unwrap();

    let device = Device {
        serial: Uuid::new_v4(),
        label: None,
    };
    access.insert(Scope::Owned, "devices", &device).unwrap();

    let loaded: Vec<Device> = access
        .query(
            Scope::Owned,
            "SELECT serial, label FROM devices WHERE serial = @s",
            &[Value::Uuid(device.serial)],
        )
        .unwrap();
    assert_eq!(loaded, vec![device]);

    access
        .execute_non_query(
            Scope::Owned,
            "INSERT INTO devices (serial) VALUES ('not-a-guid')",
            &[],
        )
        .unwrap();
    let err = access
        .query::<Device>(
            Scope::Owned,
            "SELECT serial FROM devices WHERE serial = 'not-a-guid'",
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, DbError::Format { .. }));
}

#[test]
fn test_ambient_sqlite_connection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ambient.db");
    let driver = SqliteDriver::new().unwrap();
    let connection = driver
        .connection(&format!("sqlite:{}?mode=rwc", path.display()))
        .unwrap();
    let access =
        DatabaseAccess::with_connection(Provider::EmbeddedFile, Box::new(connection)).unwrap();

    access.execute_non_query(Scope::Owned, SCHEMA, &[]).unwrap();
    let id = access
        .insert(Scope::Owned, "tasks", &Task::new("ambient", Priority::Low))
        .unwrap();
    assert_eq!(id, 1);
    assert!(
        access
            .exists(Scope::Owned, "SELECT 1 FROM tasks WHERE title = @t", &["ambient".into()])
            .unwrap()
    );
}

#[test]
fn test_sqlite_connection_rejects_desktop_rules() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("desktop.db");
    let driver = SqliteDriver::new().unwrap();
    let connection = driver
        .connection(&format!("sqlite:{}?mode=rwc", path.display()))
        .unwrap();
    let err = DatabaseAccess::with_connection(Provider::DesktopFile, Box::new(connection))
        .unwrap_err();
    assert!(matches!(err, DbError::UnsupportedProvider { .. }));
}

#[test]
fn test_unsupported_provider_for_sqlite_driver() {
    let driver = Arc::new(SqliteDriver::new().unwrap());
    let err = DatabaseAccess::new(driver, Provider::RelationalServer, "Server=db01")
        .unwrap_err();
    assert!(matches!(err, DbError::UnsupportedProvider { .. }));
}
