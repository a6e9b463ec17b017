//! Dredge - File Discovery & Archive-Aware Resolution
//!
//! Dredge feeds an ingestion pipeline one file at a time. It has two halves:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  DirWalker   │────▶│   FileScan   │────▶│  FileRecord  │──▶ host
//! │ (name match) │     │ (size/mtime) │     │  (one row)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!
//! ┌──────────────┐     plain file?  ──yes──▶ stream
//! │ ArchiveFolder│──▶  │
//! │    Source    │     no ──▶ <dir>/*.zip ──▶ entry stream
//! └──────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Entity**: one configured unit of work; a [`FileListProcessor`] or an
//!   [`ArchiveFolderSource`]
//! - **Bound**: exclusive size or modification-time limit, resolved at the
//!   start of every scan (see [`bounds`])
//! - **Context**: what the host provides; attribute lookup, `${var}`
//!   substitution and typed variables

pub mod bounds;
pub mod config;
pub mod context;
pub mod datemath;
pub mod error;
pub mod filter;
pub mod processor;
pub mod record;
pub mod resolver;
pub mod scan;
pub mod walker;

// Re-exports for convenience
pub use config::{DataSourceConfig, DredgeConfig, EntityConfig};
pub use context::{Context, EntityContext, Value, Variables};
pub use datemath::{DateMath, DateMathError, StandardDateMath};
pub use error::{DredgeError, Result};
pub use filter::{NameFilter, SizeRange, TimeRange};
pub use processor::{DataSource, EntityProcessor, SourceProperties};
pub use record::FileRecord;
pub use resolver::{ArchiveFolderSource, Encoding};
pub use scan::{FileListProcessor, FileScan, ScanSettings};
pub use walker::DirWalker;
