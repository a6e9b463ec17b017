//! Capability interfaces the host framework drives.

use crate::context::Context;
use crate::error::Result;
use crate::record::FileRecord;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Produces records for one configured entity, one pull at a time.
pub trait EntityProcessor {
    /// Validate and capture the entity's structural configuration.
    fn init(&mut self, ctx: &dyn Context) -> Result<()>;

    /// Next record, or `Ok(None)` once the current pass is exhausted.
    fn next_record(&mut self, ctx: &dyn Context) -> Result<Option<FileRecord>>;
}

/// Properties a data source is initialised with (`basePath`, `encoding`).
pub type SourceProperties = BTreeMap<String, String>;

/// Resolves queries to readable streams.
pub trait DataSource {
    fn init(&mut self, props: &SourceProperties) -> Result<()>;

    /// Open a fresh stream for `query`. The caller owns and closes it.
    fn open(&self, query: &str) -> Result<Box<dyn BufRead + Send>>;

    fn close(&mut self);
}
