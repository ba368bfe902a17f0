//! Pipeline module: runs a query against a record set.
//!
//! Stages run strictly in order: resolve fields, coerce values, filter, count, sort,
//! paginate. Only the first two can fail, and both finish before any record is read.

use std::borrow::Borrow;

use tracing::{debug, trace, warn};

use crate::compiler::{CompiledPredicate, FilterCompiler};
use crate::config::EngineConfig;
use crate::expr::{QueryRequest, QuerySpec};
use crate::page::PageResult;
use crate::schema::{FieldRegistry, Queryable};
use crate::sorter::{CompiledComparator, SortCompiler};
use crate::{QueryError, QueryResult};

/// Entry point for running queries over records of type `R`.
///
/// The engine holds no per-request state and can be shared across threads.
pub struct QueryEngine<'r, R> {
    registry: &'r FieldRegistry<R>,
    config: EngineConfig,
}

impl<R: Queryable> QueryEngine<'static, R> {
    /// An engine over the record type's own registry.
    pub fn for_record() -> QueryResult<Self> {
        R::registry().map(Self::new)
    }
}

impl<'r, R: 'static> QueryEngine<'r, R> {
    pub fn new(registry: &'r FieldRegistry<R>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &'r FieldRegistry<R> {
        self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates `spec` and compiles it. Every field is resolved before any value is
    /// coerced, and the first failure aborts the whole query.
    pub fn compile(&self, spec: &QuerySpec) -> QueryResult<CompiledQuery<R>> {
        self.compile_stages(spec).inspect_err(|err| warn!(error = %err, "rejected query"))
    }

    fn compile_stages(&self, spec: &QuerySpec) -> QueryResult<CompiledQuery<R>> {
        if spec.page_size() > self.config.max_page_size {
            return Err(QueryError::InvalidPageRequest {
                page_number: i64::from(spec.page_number()),
                page_size: i64::from(spec.page_size()),
            });
        }
        let filters = FilterCompiler::resolve(spec.filters(), self.registry)?;
        let comparator = SortCompiler::compile(spec.sorts(), self.registry)?;
        let predicate = FilterCompiler::compile_resolved(&filters)?;
        debug!(
            filters = predicate.len(),
            sort_keys = comparator.len(),
            page_number = spec.page_number(),
            page_size = spec.page_size(),
            "compiled query"
        );
        Ok(CompiledQuery {
            predicate,
            comparator,
            page_number: spec.page_number(),
            page_size: spec.page_size(),
            skip: spec.skip(),
        })
    }

    /// Runs `spec` over `records`. Records may be owned or borrowed.
    pub fn execute<T, I>(&self, spec: QuerySpec, records: I) -> QueryResult<PageResult<T>>
    where
        T: Borrow<R>,
        I: IntoIterator<Item = T>,
    {
        Ok(self.compile(&spec)?.apply(records))
    }

    /// Applies the configured page defaults and limits to `request`.
    pub fn spec_for(&self, request: QueryRequest) -> QueryResult<QuerySpec> {
        request
            .into_spec(&self.config)
            .inspect_err(|err| warn!(error = %err, "rejected query"))
    }

    /// Validates `request` with [`spec_for`](Self::spec_for), then runs it.
    pub fn execute_request<T, I>(&self, request: QueryRequest, records: I) -> QueryResult<PageResult<T>>
    where
        T: Borrow<R>,
        I: IntoIterator<Item = T>,
    {
        self.execute(self.spec_for(request)?, records)
    }
}

/// A validated, compiled query. Applying it cannot fail.
pub struct CompiledQuery<R> {
    predicate: CompiledPredicate<R>,
    comparator: CompiledComparator<R>,
    page_number: u32,
    page_size: u32,
    skip: usize,
}

impl<R> CompiledQuery<R> {
    pub fn predicate(&self) -> &CompiledPredicate<R> {
        &self.predicate
    }

    pub fn comparator(&self) -> &CompiledComparator<R> {
        &self.comparator
    }

    /// Filters, counts, sorts and slices `records` into one page.
    ///
    /// `total_count` is the number of matches before pagination. A page past the end
    /// is empty.
    pub fn apply<T, I>(&self, records: I) -> PageResult<T>
    where
        T: Borrow<R>,
        I: IntoIterator<Item = T>,
    {
        let mut scanned = 0usize;
        let mut matched: Vec<T> = records
            .into_iter()
            .inspect(|_| scanned += 1)
            .filter(|record| self.predicate.matches(record.borrow()))
            .collect();
        let total_count = matched.len();

        self.comparator.sort(&mut matched);

        let start = self.skip.min(total_count);
        let end = start.saturating_add(self.page_size as usize).min(total_count);
        matched.truncate(end);
        let items: Vec<T> = matched.drain(start..).collect();
        trace!(scanned, total_count, returned = items.len(), "applied query");

        PageResult {
            items,
            total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
