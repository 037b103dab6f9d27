//! Binds externally supplied parameter values onto a compiled command.

use crate::coerce::RawValue;
use crate::command::types::{parameter_key, BoundCommand, BoundValue, CommandDescriptor};
use indexmap::IndexMap;
use std::sync::Arc;

/// Ordered external name → untyped value mapping.
///
/// Keys compare with leading `@` markers stripped and case folded; a later insert under an
/// equal key replaces the value but keeps the original position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterValues {
    entries: IndexMap<String, RawValue>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<RawValue>) {
        self.entries.insert(parameter_key(name), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.entries.get(&parameter_key(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.entries.shift_remove(&parameter_key(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds values from request query pairs: first occurrence per key wins, blank values
    /// are dropped.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values = Self::new();
        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref());
            if value.trim().is_empty() || values.get(name).is_some() {
                continue;
            }
            values.insert(name, value);
        }
        values
    }
}

impl<K: AsRef<str>, V: Into<RawValue>> FromIterator<(K, V)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name.as_ref(), value);
        }
        values
    }
}

/// Produces a fresh binding of `command` from `values`. The descriptor itself is never
/// modified; unmatched external values are ignored.
pub fn bind(command: Arc<CommandDescriptor>, values: &ParameterValues) -> BoundCommand {
    let mut bound: Vec<BoundValue> = command
        .parameters
        .iter()
        .map(|p| p.initial_value())
        .collect();

    for (name, raw) in values.iter() {
        let Some(index) = command.position(name) else {
            continue;
        };
        let parameter = &command.parameters[index];
        let slot = &mut bound[index];
        if raw.is_null() {
            if parameter.is_nullable {
                *slot = BoundValue::Null;
            }
            continue;
        }
        if let Some(value) = parameter.target().coerce(raw, slot.as_value()) {
            *slot = BoundValue::Value(value);
        } else {
            tracing::debug!(parameter = %parameter.name, value = %raw, "value not coercible, keeping prior");
        }
    }

    BoundCommand {
        descriptor: command,
        values: bound,
    }
}
