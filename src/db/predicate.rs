//! Single-field comparison predicates for WHERE clauses.
//!
//! A [`SearchParameter`] renders as `field <op> @name`. A NULL value renders
//! as `IS NULL` / `IS NOT NULL` and binds nothing; operators without a NULL
//! form are rejected.

use crate::db::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::models::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    Like,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Operator {
    /// SQL symbol of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Like => "LIKE",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }

    /// NULL form of the operator, if it has one.
    fn null_form(&self) -> Option<&'static str> {
        match self {
            Self::Equal | Self::Like => Some("IS NULL"),
            Self::NotEqual => Some("IS NOT NULL"),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Like => "like",
            Self::Greater => "greater",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::Less => "less",
            Self::LessOrEqual => "less_or_equal",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Operator {
    type Err = DbError;

    /// Accepts the operator name or its SQL symbol.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "eq" | "=" => Ok(Self::Equal),
            "not_equal" | "ne" | "<>" | "!=" => Ok(Self::NotEqual),
            "like" => Ok(Self::Like),
            "greater" | "gt" | ">" => Ok(Self::Greater),
            "greater_or_equal" | "ge" | ">=" => Ok(Self::GreaterOrEqual),
            "less" | "lt" | "<" => Ok(Self::Less),
            "less_or_equal" | "le" | "<=" => Ok(Self::LessOrEqual),
            other => Err(DbError::invalid_input(format!("Unknown operator: {}", other))),
        }
    }
}

/// A comparison between a column and a bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParameter {
    field: String,
    parameter: String,
    operator: Operator,
    value: Value,
}

impl SearchParameter {
    /// `parameter` is the placeholder name without its sigil.
    pub fn new(
        field: impl Into<String>,
        parameter: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            parameter: parameter.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Render the predicate fragment for a dialect.
    pub fn render(&self, dialect: &dyn Dialect) -> DbResult<String> {
        if self.field.trim().is_empty() {
            return Err(DbError::invalid_input("Predicate field cannot be empty"));
        }
        let sigil = dialect.parameter_sigil();
        if self.parameter.is_empty() || self.parameter.starts_with(sigil) {
            return Err(DbError::invalid_input(format!(
                "Parameter name '{}' must be non-empty and given without the '{}' prefix",
                self.parameter, sigil
            )));
        }

        if self.value.is_null() {
            return match self.operator.null_form() {
                Some(form) => Ok(format!("{} {}", self.field, form)),
                None => Err(DbError::unsupported_predicate(&self.field, self.operator)),
            };
        }

        Ok(format!(
            "{} {} {}",
            self.field,
            self.operator.symbol(),
            dialect.placeholder(&self.parameter)
        ))
    }

    /// Value to bind for the rendered placeholder; `None` when nothing is bound.
    pub fn bound_value(&self) -> Option<&Value> {
        (!self.value.is_null()).then_some(&self.value)
    }
}

/// Render predicates joined with `AND` and collect their values in order.
///
/// Returns an empty fragment for an empty list; the caller adds `WHERE`.
pub fn where_clause(
    dialect: &dyn Dialect,
    parameters: &[SearchParameter],
) -> DbResult<(String, Vec<Value>)> {
    let mut fragments = Vec::with_capacity(parameters.len());
    let mut values = Vec::new();
    for parameter in parameters {
        fragments.push(parameter.render(dialect)?);
        values.extend(parameter.bound_value().cloned());
    }
    Ok((fragments.join(" AND "), values))
}
