//! Source module: where records come from, and the handler that queries them.

use std::convert::Infallible;

use tracing::debug;

use crate::expr::QueryRequest;
use crate::page::PageResult;
use crate::pipeline::QueryEngine;
use crate::HandlerError;

/// Supplies the finite record set for one request.
pub trait RecordSource<R> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(&self) -> Result<Vec<R>, Self::Error>;
}

/// An in-memory record source. Every fetch returns a copy of the records.
#[derive(Debug, Clone, Default)]
pub struct VecSource<R> {
    records: Vec<R>,
}

impl<R> VecSource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}

impl<R: Clone> RecordSource<R> for VecSource<R> {
    type Error = Infallible;

    fn fetch(&self) -> Result<Vec<R>, Self::Error> {
        Ok(self.records.clone())
    }
}

impl<R> FromIterator<R> for VecSource<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Decodes a request, validates it, fetches records and returns one page.
pub struct QueryHandler<'r, S, R> {
    engine: QueryEngine<'r, R>,
    source: S,
}

impl<'r, S, R> QueryHandler<'r, S, R>
where
    S: RecordSource<R>,
    R: 'static,
{
    pub fn new(engine: QueryEngine<'r, R>, source: S) -> Self {
        Self { engine, source }
    }

    pub fn engine(&self) -> &QueryEngine<'r, R> {
        &self.engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The request is validated and compiled before the source is touched.
    pub fn handle(&self, request: QueryRequest) -> Result<PageResult<R>, HandlerError<S::Error>> {
        let spec = self.engine.spec_for(request)?;
        let query = self.engine.compile(&spec)?;
        let records = self.source.fetch().map_err(HandlerError::Source)?;
        debug!(fetched = records.len(), "fetched records");
        Ok(query.apply(records))
    }

    /// Like [`handle`](Self::handle), converting each returned record with `f`.
    pub fn handle_mapped<U>(
        &self,
        request: QueryRequest,
        f: impl FnMut(R) -> U,
    ) -> Result<PageResult<U>, HandlerError<S::Error>> {
        self.handle(request).map(|page| page.map(f))
    }
}
