//! Schema module: the per-record-type field registry.
//!
//! This module provides FieldRegistry and its builder. A registry maps each filterable or
//! sortable field name to its kind, an accessor, and the operators it accepts. Registries are
//! built once and only read afterwards.

use std::collections::HashMap;
use std::fmt;

use crate::expr::FilterOperator;
use crate::types::{FieldKind, OperatorSet, Value};
use crate::{QueryError, QueryResult};

/// Reads one field of a record.
pub type Getter<R> = for<'r> fn(&'r R) -> Value<'r>;

/// Declared members of an enumeration: symbolic name and ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDomain {
    members: &'static [(&'static str, u32)],
}

impl EnumDomain {
    pub const fn new(members: &'static [(&'static str, u32)]) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &'static [(&'static str, u32)] {
        self.members
    }

    /// Looks a member up by name, ignoring ASCII case.
    pub fn ordinal_of(&self, name: &str) -> Option<u32> {
        self.members
            .iter()
            .find(|(member, _)| member.eq_ignore_ascii_case(name))
            .map(|(_, ordinal)| *ordinal)
    }

    pub fn name_of(&self, ordinal: u32) -> Option<&'static str> {
        self.members
            .iter()
            .find(|(_, o)| *o == ordinal)
            .map(|(name, _)| *name)
    }

    pub fn contains_ordinal(&self, ordinal: u32) -> bool {
        self.name_of(ordinal).is_some()
    }
}

/// A registered field.
pub struct FieldDescriptor<R> {
    name: String,
    kind: FieldKind,
    getter: Getter<R>,
    operators: OperatorSet,
    domain: Option<EnumDomain>,
    fold_case: bool,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Operators this field may be filtered with.
    pub fn operators(&self) -> OperatorSet {
        self.operators
    }

    /// Members of the field's enumeration, for `EnumTag` fields that declare one.
    pub fn domain(&self) -> Option<&EnumDomain> {
        self.domain.as_ref()
    }

    /// Whether filter values are lowercased before comparison (key fields).
    pub fn folds_case(&self) -> bool {
        self.fold_case
    }

    pub fn get<'r>(&self, record: &'r R) -> Value<'r> {
        (self.getter)(record)
    }

    pub fn getter(&self) -> Getter<R> {
        self.getter
    }
}

impl<R> Clone for FieldDescriptor<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            getter: self.getter,
            operators: self.operators,
            domain: self.domain,
            fold_case: self.fold_case,
        }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("operators", &self.operators)
            .field("domain", &self.domain)
            .field("fold_case", &self.fold_case)
            .finish_non_exhaustive()
    }
}

pub struct FieldRegistry<R> {
    fields: Vec<FieldDescriptor<R>>,
    index: HashMap<String, usize>, // lowercased name -> position in `fields`
}

impl<R> FieldRegistry<R> {
    pub fn builder() -> FieldRegistryBuilder<R> {
        FieldRegistryBuilder::new()
    }

    /// Resolves a field name, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> QueryResult<&FieldDescriptor<R>> {
        self.get(name).ok_or_else(|| QueryError::UnknownField {
            field: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&position| &self.fields[position])
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor<R>> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R> fmt::Debug for FieldRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

pub struct FieldRegistryBuilder<R> {
    fields: Vec<FieldDescriptor<R>>,
}

impl<R> Default for FieldRegistryBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> FieldRegistryBuilder<R> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Registers a field accepting every operator meaningful for its kind.
    pub fn field(self, name: impl Into<String>, kind: FieldKind, getter: Getter<R>) -> Self {
        self.push(name.into(), kind, getter, kind.supported_operators(), None)
    }

    /// Registers an identifier field compared for equality ignoring ASCII case, such as a
    /// UUID. The getter must return the key in lowercase.
    pub fn key_field(self, name: impl Into<String>, getter: Getter<R>) -> Self {
        let operators = OperatorSet::of(&[FilterOperator::Equals, FilterOperator::NotEquals]);
        let mut builder = self.push(name.into(), FieldKind::Text, getter, operators, None);
        if let Some(field) = builder.fields.last_mut() {
            field.fold_case = true;
        }
        builder
    }

    /// Registers a field restricted to `operators`. Operators not meaningful for
    /// `kind` are dropped.
    pub fn field_with_operators(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        getter: Getter<R>,
        operators: OperatorSet,
    ) -> Self {
        let operators = kind.supported_operators().intersection(operators);
        self.push(name.into(), kind, getter, operators, None)
    }

    /// Registers an `EnumTag` field whose filter values are checked against `domain`.
    pub fn enum_field(self, name: impl Into<String>, domain: EnumDomain, getter: Getter<R>) -> Self {
        let kind = FieldKind::EnumTag;
        self.push(name.into(), kind, getter, kind.supported_operators(), Some(domain))
    }

    fn push(
        mut self,
        name: String,
        kind: FieldKind,
        getter: Getter<R>,
        operators: OperatorSet,
        domain: Option<EnumDomain>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            kind,
            getter,
            operators,
            domain,
            fold_case: false,
        });
        self
    }

    pub fn build(self) -> QueryResult<FieldRegistry<R>> {
        let mut index = HashMap::with_capacity(self.fields.len());
        for (position, field) in self.fields.iter().enumerate() {
            if index.insert(field.name.to_ascii_lowercase(), position).is_some() {
                return Err(QueryError::DuplicateField {
                    field: field.name.clone(),
                });
            }
        }
        Ok(FieldRegistry {
            fields: self.fields,
            index,
        })
    }
}

/// A record type with a registry of queryable fields.
///
/// The registry is built on first use. A declaration error is returned on every call.
pub trait Queryable: Sized + 'static {
    fn registry() -> QueryResult<&'static FieldRegistry<Self>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticket {
        title: String,
        points: f64,
        state: u32,
    }

    const STATES: EnumDomain = EnumDomain::new(&[("Open", 0), ("Closed", 1), ("Archived", 5)]);

    fn registry() -> FieldRegistry<Ticket> {
        FieldRegistry::<Ticket>::builder()
            .field("title", FieldKind::Text, |t| Value::text(&t.title))
            .field_with_operators(
                "points",
                FieldKind::Number,
                |t| Value::Number(t.points),
                OperatorSet::of(&[FilterOperator::Equals, FilterOperator::StartsWith]),
            )
            .enum_field("state", STATES, |t| Value::EnumTag(t.state))
            .build()
            .unwrap()
    }

    #[test]
    fn test_field_registration_and_resolution() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.resolve("title").unwrap().kind(), FieldKind::Text);
        assert_eq!(reg.resolve("state").unwrap().kind(), FieldKind::EnumTag);
        assert!(reg.get("owner").is_none());
    }

    #[test]
    fn test_resolution_ignores_ascii_case() {
        let reg = registry();
        assert_eq!(reg.resolve("Title").unwrap().name(), "title");
        assert_eq!(reg.resolve("POINTS").unwrap().name(), "points");
    }

    #[test]
    fn test_unknown_field() {
        let reg = registry();
        match reg.resolve("secretField") {
            Err(QueryError::UnknownField { field }) => assert_eq!(field, "secretField"),
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn test_operator_narrowing_never_widens() {
        let reg = registry();
        let ops = reg.resolve("points").unwrap().operators();
        assert!(ops.contains(FilterOperator::Equals));
        assert!(!ops.contains(FilterOperator::StartsWith));
        assert!(!ops.contains(FilterOperator::GreaterThan));
    }

    #[test]
    fn test_getter_reads_record() {
        let reg = registry();
        let ticket = Ticket {
            title: "Ship it".into(),
            points: 3.0,
            state: 5,
        };
        assert_eq!(reg.resolve("title").unwrap().get(&ticket), Value::text("Ship it"));
        assert_eq!(reg.resolve("points").unwrap().get(&ticket), Value::Number(3.0));
        assert_eq!(reg.resolve("state").unwrap().get(&ticket), Value::EnumTag(5));
    }

    #[test]
    fn test_enum_domain_lookup() {
        assert_eq!(STATES.ordinal_of("closed"), Some(1));
        assert_eq!(STATES.ordinal_of("Reopened"), None);
        assert_eq!(STATES.name_of(5), Some("Archived"));
        assert!(!STATES.contains_ordinal(2));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let result = FieldRegistry::<Ticket>::builder()
            .field("title", FieldKind::Text, |t| Value::text(&t.title))
            .field("Title", FieldKind::Text, |t| Value::text(&t.title))
            .build();
        assert!(matches!(result, Err(QueryError::DuplicateField { field }) if field == "Title"));
    }

    #[test]
    fn test_key_field() {
        let reg = FieldRegistry::<Ticket>::builder()
            .key_field("ref", |t| Value::text(&t.title))
            .field("title", FieldKind::Text, |t| Value::text(&t.title))
            .build()
            .unwrap();
        let key = reg.resolve("ref").unwrap();
        assert_eq!(key.kind(), FieldKind::Text);
        assert!(key.folds_case());
        assert_eq!(
            key.operators().iter().collect::<Vec<_>>(),
            vec![FilterOperator::Equals, FilterOperator::NotEquals]
        );
        assert!(!reg.resolve("title").unwrap().folds_case());
    }

    struct Misdeclared;

    impl Queryable for Misdeclared {
        fn registry() -> QueryResult<&'static FieldRegistry<Self>> {
            static REGISTRY: std::sync::OnceLock<QueryResult<FieldRegistry<Misdeclared>>> =
                std::sync::OnceLock::new();
            REGISTRY
                .get_or_init(|| {
                    FieldRegistry::<Misdeclared>::builder()
                        .field("id", FieldKind::Number, |_| Value::Number(0.0))
                        .key_field("ID", |_| Value::text(""))
                        .build()
                })
                .as_ref()
                .map_err(QueryError::clone)
        }
    }

    #[test]
    fn test_declaration_error_is_returned_every_time() {
        for _ in 0..2 {
            assert!(matches!(
                Misdeclared::registry(),
                Err(QueryError::DuplicateField { field }) if field == "ID"
            ));
        }
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let names: Vec<_> = registry().field_names().map(str::to_string).collect();
        assert_eq!(names, vec!["title", "points", "state"]);
    }
}
