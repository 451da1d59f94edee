//! Entity field mapping.
//!
//! Every persisted entity registers a static table of [`Field`] descriptors.
//! That table is the single source of truth for "what counts as a column":
//! mapped reads, inserts, updates and field lists all consult it, and a struct
//! member that is not registered is never read or written by the engine.
//!
//! Tables are declared with the [`field!`](crate::field) macro:
//!
//! ```ignore
//! impl Entity for Customer {
//!     fn fields() -> &'static [Field<Self>] {
//!         static FIELDS: &[Field<Customer>] = &[
//!             field!(Customer, id: i64, default = 0).column("CustomerId").read_only().key(),
//!             field!(Customer, name: String, default = ""),
//!             field!(Customer, nickname: Option<String>, default = None::<String>),
//!         ];
//!         FIELDS
//!     }
//! }
//! ```

use crate::error::DbResult;
use crate::models::Value;
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Underlying value type of a mapped field, after unwrapping `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Blob,
    Uuid,
    DateTime,
    /// Symbolic enumeration with the given variant names, in ordinal order
    Enum(&'static [&'static str]),
}

impl FieldKind {
    /// Name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Uuid => "uuid",
            Self::DateTime => "datetime",
            Self::Enum(_) => "enum",
        }
    }
}

/// Rust types that can back a mapped field.
///
/// `Option<T>` reports the kind of `T`, which is how nullable wrappers are
/// unwrapped before coercion.
pub trait FieldType {
    const KIND: FieldKind;
}

macro_rules! impl_field_type {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl FieldType for $ty {
                const KIND: FieldKind = FieldKind::$kind;
            }
        )+
    };
}

impl_field_type! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Blob,
    Uuid => Uuid,
    NaiveDateTime => DateTime,
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
}

/// Static descriptor of one mapped field of entity `E`.
pub struct Field<E> {
    property: &'static str,
    column: &'static str,
    kind: FieldKind,
    read_only: bool,
    key: bool,
    default: fn() -> Value,
    get: fn(&E) -> Value,
    set: fn(&mut E, Value) -> DbResult<()>,
}

impl<E> Field<E> {
    /// Create a descriptor whose column name equals the property name.
    pub const fn new(
        property: &'static str,
        kind: FieldKind,
        default: fn() -> Value,
        get: fn(&E) -> Value,
        set: fn(&mut E, Value) -> DbResult<()>,
    ) -> Self {
        Self {
            property,
            column: property,
            kind,
            read_only: false,
            key: false,
            default,
            get,
            set,
        }
    }

    /// Override the database column name.
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    /// Exclude this field from write operations.
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Mark this field as part of the entity key.
    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn column_name(&self) -> &'static str {
        self.column
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Value used when the raw cell is NULL.
    pub fn default_value(&self) -> Value {
        (self.default)()
    }

    /// Read the field from an entity.
    pub fn get(&self, entity: &E) -> Value {
        (self.get)(entity)
    }

    /// Assign an already-coerced value to the field.
    pub fn set(&self, entity: &mut E, value: Value) -> DbResult<()> {
        (self.set)(entity, value)
    }
}

impl<E> std::fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("property", &self.property)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .field("read_only", &self.read_only)
            .field("key", &self.key)
            .finish()
    }
}

/// A type whose instances can be written to and materialized from rows.
pub trait Entity: Default + 'static {
    /// The static field table, in column order.
    fn fields() -> &'static [Field<Self>];
}

/// Mapped fields of `E` in registration order, optionally without read-only fields.
pub fn mapped_fields<E: Entity>(no_read_only: bool) -> impl Iterator<Item = &'static Field<E>> {
    E::fields()
        .iter()
        .filter(move |f| !(no_read_only && f.read_only))
}

/// Key-flagged fields of `E`.
pub fn key_fields<E: Entity>() -> impl Iterator<Item = &'static Field<E>> {
    E::fields().iter().filter(|f| f.key)
}

/// Comma-separated column list of `E`, e.g. for `SELECT <list> FROM ...`.
pub fn field_list<E: Entity>(no_read_only: bool) -> String {
    mapped_fields::<E>(no_read_only)
        .map(|f| f.column)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Look up a mapped field by column name, ignoring ASCII case.
pub fn field_for_column<E: Entity>(column: &str) -> Option<&'static Field<E>> {
    E::fields()
        .iter()
        .find(|f| f.column.eq_ignore_ascii_case(column))
}
