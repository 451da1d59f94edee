//! Entity-level insert and update helpers.
//!
//! Statements are generated from the entity's field table. Read-only fields
//! are never written. Generated placeholders use the named form and are bound
//! positionally like any other command.

use crate::db::coerce::coerce;
use crate::db::driver::Command;
use crate::db::executor::{DatabaseAccess, Scope};
use crate::db::mapping::{Entity, FieldKind, key_fields, mapped_fields};
use crate::error::{DbError, DbResult};
use crate::models::Value;
use tracing::debug;

/// Token in an update template replaced by the generated SET list.
pub const SET_TOKEN: &str = "{0}";

fn require_table(table: &str) -> DbResult<&str> {
    let table = table.trim();
    if table.is_empty() {
        return Err(DbError::invalid_input("Table name cannot be empty"));
    }
    Ok(table)
}

/// Identity value returned by the provider, or 0 if it produced none.
fn identity_from(raw: Value) -> DbResult<i64> {
    match coerce(raw, Value::Int(0), FieldKind::Int)? {
        Value::Int(id) => Ok(id),
        other => Err(DbError::internal(format!(
            "Identity coerced to unexpected value {}",
            other
        ))),
    }
}

impl DatabaseAccess {
    fn insert_command<E: Entity>(&self, table: &str, entity: &E) -> DbResult<Command> {
        let table = require_table(table)?;
        let fields: Vec<_> = mapped_fields::<E>(true).collect();
        if fields.is_empty() {
            return Err(DbError::invalid_input(format!(
                "No writable fields to insert into {}",
                table
            )));
        }

        let columns = fields
            .iter()
            .map(|f| f.column_name())
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (0..fields.len())
            .map(|i| self.dialect().placeholder(&format!("p{}", i)))
            .collect::<Vec<_>>()
            .join(", ");
        let values: Vec<Value> = fields.iter().map(|f| f.get(entity)).collect();

        let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders);
        self.prepare(&sql, &values)
    }

    /// Insert one entity and return the identity generated for it.
    ///
    /// The identity is read in the same transaction as the insert. Returns 0
    /// when the provider reports no identity (e.g. the table has none).
    pub fn insert<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        table: &str,
        entity: &E,
    ) -> DbResult<i64> {
        let command = self.insert_command(table, entity)?;
        let identity = Command::new(self.dialect().last_identity_query());
        debug!(sql = %command.text, params = command.parameters.len(), "Inserting entity");

        let raw = self.run(scope.into(), |conn| {
            conn.execute(&command)?;
            conn.query_scalar(&identity)
        })?;
        identity_from(raw)
    }

    /// Insert each entity, returning their identities in order.
    ///
    /// With a borrowed transaction all inserts share it. Otherwise each insert
    /// runs in its own transaction: a failure leaves earlier records committed.
    pub fn insert_all<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        table: &str,
        entities: &[E],
    ) -> DbResult<Vec<i64>> {
        match scope.into() {
            Scope::Borrowed(tx) => entities
                .iter()
                .map(|e| self.insert(&mut *tx, table, e))
                .collect(),
            Scope::Owned => entities
                .iter()
                .map(|e| self.insert(Scope::Owned, table, e))
                .collect(),
        }
    }

    fn update_command<E: Entity>(
        &self,
        template: &str,
        entity: &E,
        where_values: &[Value],
    ) -> DbResult<Command> {
        if !template.contains(SET_TOKEN) {
            return Err(DbError::invalid_input(format!(
                "Update template must contain the {} token",
                SET_TOKEN
            )));
        }

        let fields: Vec<_> = mapped_fields::<E>(true).collect();
        if fields.is_empty() {
            return Err(DbError::invalid_input("No writable fields to update"));
        }

        let set_list = fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "{} = {}",
                    f.column_name(),
                    self.dialect().placeholder(&format!("u{}", i))
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        // SET values precede the template's own values in text order.
        let mut values: Vec<Value> = fields.iter().map(|f| f.get(entity)).collect();
        values.extend_from_slice(where_values);

        let sql = template.replacen(SET_TOKEN, &set_list, 1);
        self.prepare(&sql, &values)
    }

    /// Update rows from an entity using a statement template.
    ///
    /// `{0}` in the template is replaced by `col = @u0, ...` over the writable
    /// fields, e.g. `UPDATE orders SET {0} WHERE id = @id`. `where_values` bind
    /// to the placeholders the template itself contains, so the token must
    /// come before them.
    pub fn update<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        template: &str,
        entity: &E,
        where_values: &[Value],
    ) -> DbResult<u64> {
        let command = self.update_command(template, entity, where_values)?;
        debug!(sql = %command.text, params = command.parameters.len(), "Updating entity");
        self.run(scope.into(), |conn| conn.execute(&command))
    }

    /// Update each entity with the same template, returning affected counts.
    ///
    /// `where_values` supplies each record's template values. Atomicity is the
    /// same as [`DatabaseAccess::insert_all`].
    pub fn update_all<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        template: &str,
        entities: &[E],
        where_values: impl Fn(&E) -> Vec<Value>,
    ) -> DbResult<Vec<u64>> {
        match scope.into() {
            Scope::Borrowed(tx) => entities
                .iter()
                .map(|e| self.update(&mut *tx, template, e, &where_values(e)))
                .collect(),
            Scope::Owned => entities
                .iter()
                .map(|e| self.update(Scope::Owned, template, e, &where_values(e)))
                .collect(),
        }
    }

    /// Update the row identified by the entity's key fields.
    pub fn update_by_key<'t, 'a: 't, E: Entity>(
        &self,
        scope: impl Into<Scope<'t, 'a>>,
        table: &str,
        entity: &E,
    ) -> DbResult<u64> {
        let table = require_table(table)?;
        let keys: Vec<_> = key_fields::<E>().collect();
        if keys.is_empty() {
            return Err(DbError::invalid_input(format!(
                "No key fields registered for updates to {}",
                table
            )));
        }

        let condition = keys
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "{} = {}",
                    f.column_name(),
                    self.dialect().placeholder(&format!("k{}", i))
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let key_values: Vec<Value> = keys.iter().map(|f| f.get(entity)).collect();

        let template = format!("UPDATE {} SET {} WHERE {}", table, SET_TOKEN, condition);
        self.update(scope, &template, entity, &key_values)
    }
}
