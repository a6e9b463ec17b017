//! Scan driver: turns an entity's configuration into a lazy stream of
//! [`FileRecord`]s.
//!
//! Structural settings (patterns, base directory, recursion) are fixed at
//! `init`. Bounds are resolved again at the start of every scan because they
//! may be relative to "now" or to variables that change between passes.

use crate::bounds::ResolvedBounds;
use crate::context::{attr, Context};
use crate::datemath::{DateMath, StandardDateMath};
use crate::error::{DredgeError, Result};
use crate::filter::NameFilter;
use crate::processor::EntityProcessor;
use crate::record::FileRecord;
use crate::walker::DirWalker;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Structural configuration of a file-list entity.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Absolute base directory
    pub base_dir: PathBuf,
    pub recursive: bool,
    pub names: NameFilter,
}

impl ScanSettings {
    /// Read `fileName`, `excludes`, `baseDir` and `recursive` from the context.
    pub fn from_context(ctx: &dyn Context) -> Result<Self> {
        let pattern = compile_attribute(ctx, attr::FILE_NAME)?;

        let raw_dir = ctx
            .entity_attribute(attr::BASE_DIR)
            .ok_or_else(|| DredgeError::MissingAttribute(attr::BASE_DIR.to_string()))?;
        let base_dir = PathBuf::from(ctx.replace_tokens(&raw_dir));
        if !base_dir.is_dir() {
            return Err(DredgeError::NotADirectory(base_dir));
        }
        let base_dir = absolutize(&base_dir)?;

        let recursive = ctx
            .entity_attribute(attr::RECURSIVE)
            .map_or(false, |r| r.eq_ignore_ascii_case("true"));

        let exclude = compile_attribute(ctx, attr::EXCLUDES)?;

        Ok(Self {
            base_dir,
            recursive,
            names: NameFilter::new(pattern, exclude),
        })
    }
}

fn compile_attribute(ctx: &dyn Context, name: &str) -> Result<Option<Regex>> {
    let Some(raw) = ctx.entity_attribute(name) else {
        return Ok(None);
    };
    Regex::new(&ctx.replace_tokens(&raw))
        .map(Some)
        .map_err(|source| DredgeError::InvalidPattern {
            attribute: name.to_string(),
            source,
        })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| DredgeError::io(path, e))?;
    Ok(cwd.join(path))
}

/// One pass over the base directory. Each candidate is stat'ed once.
pub struct FileScan {
    walker: DirWalker,
    bounds: ResolvedBounds,
    examined: u64,
    matched: u64,
    done: bool,
}

impl FileScan {
    pub fn start(settings: &ScanSettings, bounds: ResolvedBounds) -> Self {
        info!(
            base_dir = %settings.base_dir.display(),
            recursive = settings.recursive,
            bigger_than = ?bounds.size.lower,
            smaller_than = ?bounds.size.upper,
            newer_than = ?bounds.time.newer_than,
            older_than = ?bounds.time.older_than,
            "Starting file scan"
        );
        Self {
            walker: DirWalker::new(&settings.base_dir, settings.recursive, settings.names.clone()),
            bounds,
            examined: 0,
            matched: 0,
            done: false,
        }
    }

    /// Candidates that passed the name filter and were stat'ed.
    pub fn examined(&self) -> u64 {
        self.examined
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }

    fn check(&self, path: PathBuf) -> Result<Option<FileRecord>> {
        let metadata = std::fs::metadata(&path).map_err(|e| DredgeError::io(&path, e))?;
        let size = metadata.len();
        if !self.bounds.size.matches(size) {
            return Ok(None);
        }

        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| DredgeError::io(&path, e))?
            .into();
        if !self.bounds.time.matches(modified) {
            return Ok(None);
        }

        let file_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(FileRecord {
            file_dir,
            file,
            file_absolute_path: path,
            file_size: size,
            file_last_modified: modified,
        }))
    }
}

impl Iterator for FileScan {
    type Item = Result<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let path = match self.walker.next() {
                Some(Ok(path)) => path,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    info!(
                        examined = self.examined,
                        matched = self.matched,
                        "File scan complete"
                    );
                    return None;
                }
            };

            self.examined += 1;
            match self.check(path) {
                Ok(Some(record)) => {
                    self.matched += 1;
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for FileScan {}

/// Entity processor listing files under `baseDir`.
///
/// The first `next_record` of a pass resolves bounds and starts a
/// [`FileScan`]; later calls resume it. Once exhausted it keeps returning
/// `Ok(None)` until [`reset`](Self::reset).
pub struct FileListProcessor {
    date_math: Box<dyn DateMath + Send>,
    settings: Option<ScanSettings>,
    cursor: Option<FileScan>,
}

impl FileListProcessor {
    pub fn new() -> Self {
        Self::with_date_math(Box::new(StandardDateMath::new()))
    }

    pub fn with_date_math(date_math: Box<dyn DateMath + Send>) -> Self {
        Self {
            date_math,
            settings: None,
            cursor: None,
        }
    }

    pub fn settings(&self) -> Option<&ScanSettings> {
        self.settings.as_ref()
    }

    /// `(examined, matched)` for the current or most recent pass.
    pub fn progress(&self) -> Option<(u64, u64)> {
        self.cursor
            .as_ref()
            .map(|scan| (scan.examined(), scan.matched()))
    }

    /// Forget the current pass so the next pull starts a new scan.
    pub fn reset(&mut self) {
        self.cursor = None;
    }
}

impl Default for FileListProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityProcessor for FileListProcessor {
    fn init(&mut self, ctx: &dyn Context) -> Result<()> {
        let settings = ScanSettings::from_context(ctx)?;
        debug!(base_dir = %settings.base_dir.display(), "File list entity initialised");
        self.settings = Some(settings);
        self.cursor = None;
        Ok(())
    }

    fn next_record(&mut self, ctx: &dyn Context) -> Result<Option<FileRecord>> {
        if self.cursor.is_none() {
            let settings = self.settings.as_ref().ok_or_else(|| {
                DredgeError::Config("next_record called before init".to_string())
            })?;
            let bounds = ResolvedBounds::resolve(ctx, self.date_math.as_ref())?;
            self.cursor = Some(FileScan::start(settings, bounds));
        }

        match self.cursor.as_mut().and_then(Iterator::next) {
            Some(record) => record.map(Some),
            None => Ok(None),
        }
    }
}
