//! Parameter binding.
//!
//! Values are bound to placeholders strictly by position: the Nth value binds
//! to the Nth placeholder occurrence in the command text, whatever the
//! placeholder is called. Callers must therefore write SQL text and value lists
//! in the same order.
//!
//! Named placeholders (`@name`) are recognized for every provider; bare `?`
//! is recognized only for positional providers, whose named occurrences are
//! rewritten to `?` in the final command text.

use crate::db::dialect::Dialect;
use crate::db::driver::Command;
use crate::error::{DbError, DbResult};
use crate::models::{PlaceholderStyle, Value};
use tracing::trace;

/// A placeholder occurrence in command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of the placeholder's first character
    pub start: usize,
    /// Byte offset one past the placeholder's last character
    pub end: usize,
    /// Name without the sigil; `None` for a bare `?`
    pub name: Option<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Sections of command text that never hold placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Find placeholder occurrences in `text`, left to right.
///
/// Single- or double-quoted sections, `--` and `/* */` comments and `@@name`
/// system variables are skipped.
pub fn scan_placeholders(text: &str, sigil: char, style: PlaceholderStyle) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut skip: Option<Skip> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match skip {
            Some(Skip::Quoted(q)) => {
                if c == q {
                    skip = None;
                }
                continue;
            }
            Some(Skip::LineComment) => {
                if c == '\n' {
                    skip = None;
                }
                continue;
            }
            Some(Skip::BlockComment) => {
                if c == '*' && chars.next_if(|&(_, n)| n == '/').is_some() {
                    skip = None;
                }
                continue;
            }
            None => {}
        }

        match c {
            '\'' | '"' => skip = Some(Skip::Quoted(c)),
            '-' if chars.next_if(|&(_, n)| n == '-').is_some() => skip = Some(Skip::LineComment),
            '/' if chars.next_if(|&(_, n)| n == '*').is_some() => skip = Some(Skip::BlockComment),
            '?' if style == PlaceholderStyle::Positional => found.push(Placeholder {
                start: idx,
                end: idx + 1,
                name: None,
            }),
            c if c == sigil => {
                if chars.peek().is_some_and(|&(_, next)| next == sigil) {
                    // System variable such as @@IDENTITY: consume it whole.
                    chars.next();
                    while chars.next_if(|&(_, n)| is_name_char(n)).is_some() {}
                    continue;
                }
                let name_start = idx + c.len_utf8();
                let mut end = name_start;
                while let Some((i, n)) = chars.next_if(|&(_, n)| is_name_char(n)) {
                    end = i + n.len_utf8();
                }
                if end > name_start {
                    found.push(Placeholder {
                        start: idx,
                        end,
                        name: Some(text[name_start..end].to_string()),
                    });
                }
            }
            _ => {}
        }
    }

    found
}

/// Replace every named placeholder with the positional token `?`.
fn rewrite_positional(text: &str, placeholders: &[Placeholder]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for ph in placeholders.iter().filter(|p| p.name.is_some()) {
        out.push_str(&text[last..ph.start]);
        out.push('?');
        last = ph.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Bind `values` to the placeholders of `text` and build a driver command.
///
/// Fails with [`DbError::BindingArity`] when there are fewer placeholders than
/// values. Surplus placeholders are left unbound.
pub fn bind(dialect: &dyn Dialect, text: &str, values: &[Value]) -> DbResult<Command> {
    let style = dialect.placeholder_style();
    let placeholders = scan_placeholders(text, dialect.parameter_sigil(), style);

    if placeholders.len() < values.len() {
        return Err(DbError::binding_arity(placeholders.len(), values.len()));
    }

    let command_text = match style {
        PlaceholderStyle::Named => text.to_string(),
        PlaceholderStyle::Positional => rewrite_positional(text, &placeholders),
    };

    let mut command = Command::new(command_text);
    for (idx, (placeholder, value)) in placeholders.iter().zip(values).enumerate() {
        let name = placeholder
            .name
            .clone()
            .unwrap_or_else(|| format!("p{}", idx));
        command.add_parameter(name, dialect.adapt_parameter(value.clone()));
    }

    trace!(
        placeholders = placeholders.len(),
        bound = command.parameters.len(),
        "Bound command parameters"
    );

    Ok(command)
}
