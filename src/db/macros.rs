//! Declarative macros for static entity registration.
//!
//! These macros generate the field descriptors and enum conversions that
//! replace runtime type introspection. They expand at compile time with no
//! runtime overhead beyond a static table per entity.

/// Declare one mapped field of an entity.
///
/// Produces a [`Field`](crate::db::mapping::Field) whose column name equals the
/// property name; chain `.column("..")`, `.read_only()` or `.key()` on the result.
///
/// # Example
///
/// ```ignore
/// static FIELDS: &[Field<User>] = &[
///     field!(User, id: i64, default = 0i64).read_only().key(),
///     field!(User, email: Option<String>, default = None::<String>).column("EMail"),
/// ];
/// ```
#[macro_export]
macro_rules! field {
    ($entity:ty, $prop:ident : $ty:ty, default = $default:expr $(,)?) => {
        $crate::db::mapping::Field::<$entity>::new(
            stringify!($prop),
            <$ty as $crate::db::mapping::FieldType>::KIND,
            || $crate::models::Value::from($default),
            |e: &$entity| $crate::models::Value::from(::std::clone::Clone::clone(&e.$prop)),
            |e: &mut $entity, v: $crate::models::Value| -> $crate::error::DbResult<()> {
                e.$prop = <$ty as $crate::models::FromValue>::from_value(v)?;
                Ok(())
            },
        )
    };
}

/// Declare a fieldless enum that maps to a symbolic text column.
///
/// Values are written as the variant name and read back from either the name
/// or the variant's ordinal.
///
/// # Example
///
/// ```ignore
/// sql_enum! {
///     #[derive(Default)]
///     pub enum Status {
///         #[default]
///         Active,
///         Suspended,
///     }
/// }
/// ```
#[macro_export]
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Variant names in ordinal order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($variant)),+];

            const VARIANTS: &'static [$name] = &[$($name::$variant),+];

            /// Symbolic name of this variant.
            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant), )+
                }
            }

            /// Resolve a variant from its exact symbolic name.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::NAMES
                    .iter()
                    .position(|n| *n == name)
                    .map(|idx| Self::VARIANTS[idx])
            }
        }

        impl $crate::db::mapping::FieldType for $name {
            const KIND: $crate::db::mapping::FieldKind =
                $crate::db::mapping::FieldKind::Enum($name::NAMES);
        }

        impl ::std::convert::From<$name> for $crate::models::Value {
            fn from(v: $name) -> Self {
                $crate::models::Value::Text(v.name().to_string())
            }
        }

        impl $crate::models::FromValue for $name {
            fn from_value(value: $crate::models::Value) -> $crate::error::DbResult<Self> {
                match &value {
                    $crate::models::Value::Text(s) => $name::from_name(s),
                    $crate::models::Value::Int(i) => usize::try_from(*i)
                        .ok()
                        .and_then(|idx| $name::VARIANTS.get(idx).copied()),
                    _ => None,
                }
                .ok_or_else(|| {
                    $crate::error::DbError::conversion(
                        value.to_string(),
                        stringify!($name),
                        "no matching variant",
                    )
                })
            }
        }
    };
}
