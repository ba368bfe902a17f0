//! Types module: field kinds and the typed values flowing through a query.
//!
//! This module provides the FieldKind and Value enums, plus the OperatorSet used
//! to record which filter operators a field accepts.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::expr::FilterOperator;

/// Semantic type of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Timestamp,
    EnumTag,
}

impl FieldKind {
    /// The operators that are meaningful for values of this kind.
    pub fn supported_operators(self) -> OperatorSet {
        use FilterOperator::*;
        match self {
            FieldKind::Text => OperatorSet::of(&[Equals, NotEquals, Contains, StartsWith, EndsWith]),
            FieldKind::Number | FieldKind::Timestamp | FieldKind::EnumTag => OperatorSet::of(&[
                Equals,
                NotEquals,
                GreaterThan,
                GreaterThanOrEqual,
                LessThan,
                LessThanOrEqual,
            ]),
            FieldKind::Boolean => OperatorSet::of(&[Equals, NotEquals]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "Text",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Timestamp => "Timestamp",
            FieldKind::EnumTag => "EnumTag",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
///
/// Values read from a record borrow from it where they can (`Text`); values
/// produced by coercion are always owned (`Value<'static>`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Ordinal of an enumeration member.
    EnumTag(u32),
}

impl<'a> Value<'a> {
    pub fn text(s: &'a str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Text(_) => FieldKind::Text,
            Value::Number(_) => FieldKind::Number,
            Value::Boolean(_) => FieldKind::Boolean,
            Value::Timestamp(_) => FieldKind::Timestamp,
            Value::EnumTag(_) => FieldKind::EnumTag,
        }
    }

    /// Natural order between two values of the same kind.
    ///
    /// Text is ordered by code point, numbers by `f64::total_cmp`, booleans with
    /// `false < true`, enum tags by ordinal. Values of different kinds are not
    /// comparable and yield `None`.
    pub fn compare(&self, other: &Value<'_>) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Value::Number(a), Value::Number(b)) => Some(a.total_cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::EnumTag(a), Value::EnumTag(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Number(n) => Value::Number(n),
            Value::Boolean(b) => Value::Boolean(b),
            Value::Timestamp(t) => Value::Timestamp(t),
            Value::EnumTag(o) => Value::EnumTag(o),
        }
    }
}

/// A small set of filter operators, stored as a bitmask over wire codes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OperatorSet(u16);

impl OperatorSet {
    pub const fn empty() -> Self {
        OperatorSet(0)
    }

    pub fn of(ops: &[FilterOperator]) -> Self {
        ops.iter().fold(Self::empty(), |set, op| set.with(*op))
    }

    pub fn with(self, op: FilterOperator) -> Self {
        OperatorSet(self.0 | (1 << op.code()))
    }

    pub fn contains(self, op: FilterOperator) -> bool {
        self.0 & (1 << op.code()) != 0
    }

    pub fn intersection(self, other: OperatorSet) -> Self {
        OperatorSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FilterOperator> {
        FilterOperator::ALL.into_iter().filter(move |op| self.contains(*op))
    }
}

impl fmt::Debug for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
