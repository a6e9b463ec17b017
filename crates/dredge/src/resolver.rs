//! Layered file resolver: plain file first, then the directory's archive.
//!
//! `open(query)` resolves `query` against the base path. A regular file at
//! that location is streamed directly. Otherwise the parent directory is
//! expected to hold one `.zip` archive, and the query's file name is looked
//! up at the root of that archive.
//!
//! Nothing is cached: every call lists the directory and opens the archive
//! again.

use crate::error::{DredgeError, Result};
use crate::processor::{DataSource, SourceProperties};
use std::fs::{self, File};
use encoding_rs_io::DecodeReaderBytesBuilder;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

pub const BASE_PATH: &str = "basePath";
pub const ENCODING: &str = "encoding";

const ARCHIVE_SUFFIX: &str = ".zip";

/// Character encoding of the files being served.
///
/// Labels follow the WHATWG Encoding Standard, so `ISO-8859-1` and `latin1`
/// name windows-1252.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding(&'static encoding_rs::Encoding);

impl Encoding {
    pub fn from_label(label: &str) -> Result<Self> {
        encoding_rs::Encoding::for_label_no_replacement(label.trim().as_bytes())
            .map(Encoding)
            .ok_or_else(|| DredgeError::UnsupportedEncoding(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// UTF-8 bytes are passed through untouched; anything else is transcoded
    /// to UTF-8 while reading.
    fn wrap<R: Read + Send + 'static>(self, reader: R) -> Box<dyn BufRead + Send> {
        if self.0 == encoding_rs::UTF_8 {
            return Box::new(BufReader::new(reader));
        }
        let decoded = DecodeReaderBytesBuilder::new()
            .encoding(Some(self.0))
            .build(reader);
        Box::new(BufReader::new(decoded))
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding(encoding_rs::UTF_8)
    }
}

/// [`DataSource`] serving plain files with a per-directory zip fallback.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFolderSource {
    base_path: Option<PathBuf>,
    encoding: Encoding,
}

impl ArchiveFolderSource {
    pub fn new(base_path: Option<PathBuf>, encoding: Encoding) -> Self {
        Self {
            base_path,
            encoding,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Absolute path `query` refers to.
    pub fn resolve_path(&self, query: &str) -> Result<PathBuf> {
        let root = match &self.base_path {
            Some(base) if base.is_absolute() => base.clone(),
            Some(base) => {
                let absolute = current_dir()?.join(base);
                warn!(
                    base_path = %absolute.display(),
                    "basePath is not absolute, resolving against the working directory"
                );
                absolute
            }
            None => {
                let cwd = current_dir()?;
                warn!(base_path = %cwd.display(), "basePath is empty, using the working directory");
                cwd
            }
        };
        Ok(root.join(query))
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(path).map_err(|e| DredgeError::io(path, e))?;
        Ok(self.encoding.wrap(file))
    }

    fn open_archive_entry(&self, path: &Path) -> Result<Box<dyn BufRead + Send>> {
        let dir = path.parent().unwrap_or(path);
        let archive_path = find_archive(dir)?;
        let entry = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(
            archive = %archive_path.display(),
            entry = %entry,
            "Plain file missing, falling back to archive"
        );

        let file = File::open(&archive_path).map_err(|e| DredgeError::io(&archive_path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|source| DredgeError::Archive {
            archive: archive_path.clone(),
            source,
        })?;

        let entry_error = |reason: String| DredgeError::ArchiveEntry {
            entry: entry.clone(),
            archive: archive_path.clone(),
            reason,
        };
        let mut zipped = archive
            .by_name(&entry)
            .map_err(|e| entry_error(e.to_string()))?;
        if zipped.is_dir() {
            return Err(entry_error("entry is a directory".to_string()));
        }
        // The entry reader borrows the archive, so decode it here. The size
        // in the header is not trusted for preallocation.
        let mut content = Vec::new();
        zipped
            .read_to_end(&mut content)
            .map_err(|e| entry_error(e.to_string()))?;

        Ok(self.encoding.wrap(Cursor::new(content)))
    }
}

/// First `.zip` file in `dir` by file name.
pub fn find_archive(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| DredgeError::io(dir, e))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DredgeError::io(dir, e))?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(ARCHIVE_SUFFIX) && entry.path().is_file() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DredgeError::NoArchive(dir.to_path_buf()))
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| DredgeError::io(".", e))
}

impl DataSource for ArchiveFolderSource {
    fn init(&mut self, props: &SourceProperties) -> Result<()> {
        self.base_path = props.get(BASE_PATH).map(PathBuf::from);
        self.encoding = match props.get(ENCODING) {
            Some(label) => Encoding::from_label(label)?,
            None => Encoding::default(),
        };
        Ok(())
    }

    fn open(&self, query: &str) -> Result<Box<dyn BufRead + Send>> {
        let path = self.resolve_path(query)?;
        if path.is_file() {
            return self.open_file(&path);
        }
        self.open_archive_entry(&path)
    }

    fn close(&mut self) {}
}
