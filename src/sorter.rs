//! Sorter module: composes sort conditions into one multi-key comparator.

use std::borrow::Borrow;
use std::cmp::Ordering;

use tracing::debug;

use crate::expr::{SortCondition, SortDirection};
use crate::schema::{FieldRegistry, Getter};
use crate::types::Value;
use crate::QueryResult;

struct SortKey<R> {
    getter: Getter<R>,
    direction: SortDirection,
}

/// Compares records key by key, primary key first.
///
/// With no keys every pair of records compares equal, so sorting is a no-op.
pub struct CompiledComparator<R> {
    keys: Vec<SortKey<R>>,
}

impl<R> CompiledComparator<R> {
    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        self.keys
            .iter()
            .map(|key| {
                let ordering = total_order(&(key.getter)(a), &(key.getter)(b));
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Stable sort: records equal under every key keep their relative order.
    pub fn sort<T: Borrow<R>>(&self, records: &mut [T]) {
        if self.keys.is_empty() {
            return;
        }
        records.sort_by(|a, b| self.compare(a.borrow(), b.borrow()));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// Values of one field always share a kind; ranking by kind keeps the order total if a
// getter ever disagrees with its declaration.
fn total_order(a: &Value<'_>, b: &Value<'_>) -> Ordering {
    a.compare(b).unwrap_or_else(|| a.kind().cmp(&b.kind()))
}

pub struct SortCompiler;

impl SortCompiler {
    /// Resolves every sort field, failing on the first unknown one.
    pub fn compile<R>(sorts: &[SortCondition], registry: &FieldRegistry<R>) -> QueryResult<CompiledComparator<R>> {
        let keys = sorts
            .iter()
            .map(|sort| {
                let field = registry.resolve(sort.field_name())?;
                debug!(field = field.name(), direction = %sort.direction(), "compiled sort key");
                Ok(SortKey {
                    getter: field.getter(),
                    direction: sort.direction(),
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(CompiledComparator { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;
    use crate::QueryError;

    #[derive(Debug, Clone, PartialEq)]
    struct Card {
        id: u32,
        title: &'static str,
        rank: f64,
        done: bool,
    }

    fn registry() -> FieldRegistry<Card> {
        FieldRegistry::<Card>::builder()
            .field("title", FieldKind::Text, |c| Value::text(c.title))
            .field("rank", FieldKind::Number, |c| Value::Number(c.rank))
            .field("done", FieldKind::Boolean, |c| Value::Boolean(c.done))
            .build()
            .unwrap()
    }

    fn cards() -> Vec<Card> {
        vec![
            Card { id: 1, title: "b", rank: 2.0, done: true },
            Card { id: 2, title: "a", rank: 1.0, done: false },
            Card { id: 3, title: "c", rank: 2.0, done: false },
            Card { id: 4, title: "a", rank: 3.0, done: true },
        ]
    }

    fn ids(cards: &[Card]) -> Vec<u32> {
        cards.iter().map(|c| c.id).collect()
    }

    fn sorted(sorts: &[SortCondition]) -> Vec<u32> {
        let comparator = SortCompiler::compile(sorts, &registry()).unwrap();
        let mut cards = cards();
        comparator.sort(&mut cards);
        ids(&cards)
    }

    #[test]
    fn test_sort_ascending() {
        assert_eq!(sorted(&[SortCondition::asc("rank")]), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_sort_descending() {
        assert_eq!(sorted(&[SortCondition::desc("rank")]), vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_sort_multi_key() {
        let sorts = [SortCondition::desc("rank"), SortCondition::asc("title")];
        assert_eq!(sorted(&sorts), vec![4, 1, 3, 2]);
        let sorts = [SortCondition::asc("title"), SortCondition::desc("rank")];
        assert_eq!(sorted(&sorts), vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_sort_stable() {
        // Ties on `done` keep input order.
        assert_eq!(sorted(&[SortCondition::asc("done")]), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_no_keys_keeps_input_order() {
        let comparator = SortCompiler::compile(&[], &registry()).unwrap();
        assert!(comparator.is_empty());
        let mut cards = cards();
        comparator.sort(&mut cards);
        assert_eq!(ids(&cards), vec![1, 2, 3, 4]);
        assert_eq!(comparator.compare(&cards[0], &cards[1]), Ordering::Equal);
    }

    #[test]
    fn test_sort_borrowed_records() {
        let cards = cards();
        let mut refs: Vec<&Card> = cards.iter().collect();
        let comparator = SortCompiler::compile(&[SortCondition::asc("title")], &registry()).unwrap();
        comparator.sort(&mut refs);
        assert_eq!(refs.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_unknown_sort_field() {
        let result = SortCompiler::compile(&[SortCondition::asc("secretField")], &registry());
        assert!(matches!(result, Err(QueryError::UnknownField { field }) if field == "secretField"));
    }
}
