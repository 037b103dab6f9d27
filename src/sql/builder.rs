//! Turns a bound command into a PostgreSQL statement with positional parameters.

use crate::command::{parameter_key, BoundCommand, CommandKind};
use crate::error::{AppError, DescriptorError};
use crate::sql::params::PgBindValue;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Plain or double-quoted identifier, up to `database.schema.name`.
const QUALIFIED_NAME: &str = r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")(?:\.(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")){0,2}$"#;
const PARAMETER_NAME: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static QUALIFIED_NAME_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static PARAMETER_NAME_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Result<Regex, regex::Error>>, source: &str) -> Result<&'static Regex, DescriptorError> {
    cell.get_or_init(|| Regex::new(source))
        .as_ref()
        .map_err(|e| DescriptorError::Malformed(e.to_string()))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Builds the statement for `command`. Only input and input-output parameters are bound;
/// any of them still unset is a bad request.
pub fn build_statement(command: &BoundCommand) -> Result<QueryBuf, AppError> {
    let mut values: Vec<Option<PgBindValue>> = Vec::with_capacity(command.values.len());
    for (parameter, value) in command.parameters() {
        if !parameter.direction.is_bound() {
            tracing::debug!(parameter = %parameter.name, direction = ?parameter.direction, "parameter not bound");
            values.push(None);
            continue;
        }
        match PgBindValue::from_bound(parameter.target(), value) {
            Some(v) => values.push(Some(v)),
            None => {
                return Err(AppError::BadRequest(format!(
                    "parameter '{}' requires a value",
                    parameter.name
                )))
            }
        }
    }

    let descriptor = &command.descriptor;
    match descriptor.kind {
        CommandKind::Text => Ok(rewrite_markers(&descriptor.text, command, values)),
        CommandKind::StoredProcedure => {
            let name = qualified_name(&descriptor.text)?;
            let arg_name = pattern(&PARAMETER_NAME_RE, PARAMETER_NAME)?;
            let mut q = QueryBuf::new();
            let mut args = Vec::new();
            for (parameter, value) in descriptor.parameters.iter().zip(values) {
                let Some(value) = value else { continue };
                let arg = parameter.name.trim_start_matches('@');
                if !arg_name.is_match(arg) {
                    return Err(DescriptorError::Malformed(format!(
                        "parameter name '{}' is not a valid argument name",
                        parameter.name
                    ))
                    .into());
                }
                let n = q.push_param(value);
                args.push(format!("{} => ${}", arg, n));
            }
            q.sql = format!("SELECT * FROM {}({})", name, args.join(", "));
            Ok(q)
        }
        CommandKind::TableDirect => {
            let name = qualified_name(&descriptor.text)?;
            let mut q = QueryBuf::new();
            q.sql = format!("SELECT * FROM {}", name);
            Ok(q)
        }
    }
}

fn qualified_name(text: &str) -> Result<&str, AppError> {
    if pattern(&QUALIFIED_NAME_RE, QUALIFIED_NAME)?.is_match(text) {
        Ok(text)
    } else {
        Err(DescriptorError::Malformed(format!("'{}' is not a valid object name", text)).into())
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Inclusive end of the quoted span opening at `start`. `E'...'` literals honor backslash escapes.
fn quoted_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let escapes = quote == '\''
        && start > 0
        && matches!(chars[start - 1], 'E' | 'e')
        && !(start > 1 && is_name_char(chars[start - 2]));
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' if escapes => j += 2,
            c if c == quote => return j,
            _ => j += 1,
        }
    }
    chars.len() - 1
}

/// Exclusive end of the `$tag$ ... $tag$` body opening at `start`, if one opens there.
fn dollar_quote_end(chars: &[char], start: usize) -> Option<usize> {
    if start > 0 && is_name_char(chars[start - 1]) {
        return None;
    }
    let mut j = start + 1;
    while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
        j += 1;
    }
    if chars.get(j) != Some(&'$') || chars.get(start + 1).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    let delimiter = &chars[start..=j];
    let body = j + 1;
    let end = chars[body..]
        .windows(delimiter.len())
        .position(|w| w == delimiter)
        .map(|p| body + p + delimiter.len())
        .unwrap_or(chars.len());
    Some(end)
}

/// Replaces `@name` references to bound parameters with `$n`. Literals (including dollar-quoted
/// bodies), quoted identifiers, comments, `@@` and names that match no bound parameter pass
/// through untouched.
fn rewrite_markers(text: &str, command: &BoundCommand, mut values: Vec<Option<PgBindValue>>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut positions: HashMap<usize, usize> = HashMap::new();
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = quoted_end(&chars, i);
                out.extend(&chars[i..=end]);
                i = end + 1;
            }
            '$' => match dollar_quote_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == '\n')
                    .map(|p| i + p)
                    .unwrap_or(chars.len());
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = chars[i + 2..]
                    .windows(2)
                    .position(|w| w == ['*', '/'])
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(chars.len());
                out.extend(&chars[i..end]);
                i = end;
            }
            '@' if chars.get(i + 1) == Some(&'@') => {
                out.push_str("@@");
                i += 2;
            }
            '@' if chars.get(i + 1).copied().is_some_and(is_name_start)
                && !(i > 0 && is_name_char(chars[i - 1])) =>
            {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&x| !is_name_char(x))
                    .map(|p| i + 1 + p)
                    .unwrap_or(chars.len());
                let name: String = chars[i + 1..end].iter().collect();
                let index = command.descriptor.position(&parameter_key(&name));
                match index.filter(|idx| values[*idx].is_some() || positions.contains_key(idx)) {
                    Some(idx) => {
                        let n = match positions.get(&idx) {
                            Some(n) => *n,
                            None => {
                                let n = values[idx].take().map(|v| q.push_param(v)).unwrap_or_default();
                                positions.insert(idx, n);
                                n
                            }
                        };
                        out.push('$');
                        out.push_str(&n.to_string());
                    }
                    None => out.extend(&chars[i..end]),
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    q.sql = out;
    q
}
