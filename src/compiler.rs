//! Compiler module: compiles filter conditions into a predicate over records.
//!
//! Compilation is split in two steps so callers can resolve every field before coercing any
//! value: `FilterCompiler::resolve` checks field names and operators, and
//! `FilterCompiler::compile_resolved` coerces values and builds the per-field tests.

use std::cmp::Ordering;

use tracing::debug;

use crate::coerce::coerce;
use crate::expr::{FilterCondition, FilterOperator};
use crate::schema::{FieldDescriptor, FieldRegistry, Getter};
use crate::types::Value;
use crate::{QueryError, QueryResult};

type FieldTest<R> = Box<dyn Fn(&R) -> bool + Send + Sync + 'static>;

/// A filter whose field and operator have been checked against the registry.
#[derive(Debug)]
pub struct ResolvedFilter<'a, R> {
    field: &'a FieldDescriptor<R>,
    condition: &'a FilterCondition,
}

impl<'a, R> ResolvedFilter<'a, R> {
    pub fn field(&self) -> &'a FieldDescriptor<R> {
        self.field
    }

    pub fn condition(&self) -> &'a FilterCondition {
        self.condition
    }
}

/// The conjunction of all filter conditions of a query.
pub struct CompiledPredicate<R> {
    tests: Vec<FieldTest<R>>,
}

impl<R> CompiledPredicate<R> {
    /// Evaluates the per-field tests in declaration order, stopping at the first miss.
    pub fn matches(&self, record: &R) -> bool {
        self.tests.iter().all(|test| test(record))
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

pub struct FilterCompiler;

impl FilterCompiler {
    pub fn compile<R: 'static>(
        filters: &[FilterCondition],
        registry: &FieldRegistry<R>,
    ) -> QueryResult<CompiledPredicate<R>> {
        let resolved = Self::resolve(filters, registry)?;
        Self::compile_resolved(&resolved)
    }

    /// Resolves every filter's field and checks its operator, failing on the first
    /// unknown field or unsupported operator.
    pub fn resolve<'a, R>(
        filters: &'a [FilterCondition],
        registry: &'a FieldRegistry<R>,
    ) -> QueryResult<Vec<ResolvedFilter<'a, R>>> {
        filters
            .iter()
            .map(|condition| {
                let field = registry.resolve(condition.field_name())?;
                if !field.operators().contains(condition.operator()) {
                    return Err(QueryError::UnsupportedOperator {
                        field: field.name().to_string(),
                        operator: condition.operator(),
                        kind: field.kind(),
                    });
                }
                Ok(ResolvedFilter { field, condition })
            })
            .collect()
    }

    /// Coerces every resolved filter's value and builds the composite predicate.
    pub fn compile_resolved<R: 'static>(resolved: &[ResolvedFilter<'_, R>]) -> QueryResult<CompiledPredicate<R>> {
        let mut tests = Vec::with_capacity(resolved.len());
        for filter in resolved {
            let operand = coerce(filter.condition.raw_value(), filter.field)?;
            debug!(
                field = filter.field.name(),
                operator = %filter.condition.operator(),
                value = ?operand,
                "compiled filter"
            );
            tests.push(field_test(filter.field.getter(), filter.condition.operator(), operand));
        }
        Ok(CompiledPredicate { tests })
    }
}

fn field_test<R: 'static>(getter: Getter<R>, op: FilterOperator, operand: Value<'static>) -> FieldTest<R> {
    match op {
        FilterOperator::Equals => Box::new(move |r: &R| getter(r) == operand),
        FilterOperator::NotEquals => Box::new(move |r: &R| getter(r) != operand),
        FilterOperator::GreaterThan => Box::new(move |r: &R| cmp_ord(&getter(r), &operand, Ordering::is_gt)),
        FilterOperator::GreaterThanOrEqual => Box::new(move |r: &R| cmp_ord(&getter(r), &operand, Ordering::is_ge)),
        FilterOperator::LessThan => Box::new(move |r: &R| cmp_ord(&getter(r), &operand, Ordering::is_lt)),
        FilterOperator::LessThanOrEqual => Box::new(move |r: &R| cmp_ord(&getter(r), &operand, Ordering::is_le)),
        FilterOperator::Contains => Box::new(move |r: &R| cmp_text(&getter(r), &operand, |h, n| h.contains(n))),
        FilterOperator::StartsWith => Box::new(move |r: &R| cmp_text(&getter(r), &operand, |h, n| h.starts_with(n))),
        FilterOperator::EndsWith => Box::new(move |r: &R| cmp_text(&getter(r), &operand, |h, n| h.ends_with(n))),
    }
}

// Helper for ordered comparisons. Numbers compare by IEEE order here, so NaN matches nothing.
fn cmp_ord(a: &Value<'_>, b: &Value<'_>, accept: fn(Ordering) -> bool) -> bool {
    let ordering = match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        _ => a.compare(b),
    };
    ordering.is_some_and(accept)
}

// Helper for ordinal substring comparisons
fn cmp_text(a: &Value<'_>, b: &Value<'_>, test: fn(&str, &str) -> bool) -> bool {
    match (a.as_text(), b.as_text()) {
        (Some(haystack), Some(needle)) => test(haystack, needle),
        _ => false,
    }
}
