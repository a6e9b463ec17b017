//! End-to-end tests for dredge
//!
//! Drives the file-list processor and the archive-aware data source the way a
//! host framework would: init once, then pull records or open streams.

use chrono::{DateTime, Utc};
use dredge::{
    ArchiveFolderSource, DataSource, DredgeConfig, DredgeError, EntityContext, EntityProcessor,
    FileListProcessor, FileRecord, SourceProperties, StandardDateMath, Value, Variables,
};
use filetime::{set_file_mtime, FileTime};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Create a test environment with a temp directory tree
struct TestEnv {
    /// Temp directory (cleaned up on drop)
    _temp: TempDir,
    /// Root directory for input files
    pub base_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp.path().join("base");
        fs::create_dir_all(&base_dir).expect("Failed to create base dir");
        Self {
            _temp: temp,
            base_dir,
        }
    }

    fn write_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.base_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn write_aged(&self, name: &str, size: usize, mtime_secs: i64) -> PathBuf {
        let path = self.write_file(name, &vec![b'.'; size]);
        set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
        path
    }

    fn write_zip(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.base_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        for (entry, content) in entries {
            zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn context(&self) -> EntityContext {
        EntityContext::default().with_attribute("baseDir", self.base_dir.to_string_lossy())
    }

    fn source(&self) -> ArchiveFolderSource {
        let mut props = SourceProperties::new();
        props.insert("basePath".to_string(), self.base_dir.to_string_lossy().into_owned());
        let mut source = ArchiveFolderSource::default();
        source.init(&props).unwrap();
        source
    }
}

fn scan(ctx: &EntityContext) -> Vec<FileRecord> {
    let mut processor = FileListProcessor::new();
    processor.init(ctx).unwrap();
    let mut records = Vec::new();
    while let Some(record) = processor.next_record(ctx).unwrap() {
        records.push(record);
    }
    records
}

fn names(records: &[FileRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|r| r.file.clone()).collect();
    names.sort();
    names
}

fn read_all(source: &ArchiveFolderSource, query: &str) -> Vec<u8> {
    let mut out = Vec::new();
    source.open(query).unwrap().read_to_end(&mut out).unwrap();
    out
}

// ============================================================================
// Scan Tests
// ============================================================================

#[test]
fn test_scan_size_and_time_window() {
    let env = TestEnv::new();
    env.write_aged("x1.log", 5, 1_000_000);
    env.write_aged("x2.log", 50, 2_000_000);

    let now = DateTime::<Utc>::from_timestamp(2_000_000 + 86_400 / 2, 0).unwrap();
    let ctx = env
        .context()
        .with_attribute("fileName", r"x.*\.log")
        .with_attribute("biggerThan", "10")
        .with_attribute("newerThan", "'NOW-1DAY'");

    let mut processor = FileListProcessor::with_date_math(Box::new(StandardDateMath::at(now)));
    processor.init(&ctx).unwrap();
    let first = processor.next_record(&ctx).unwrap().unwrap();
    assert_eq!(first.file, "x2.log");
    assert_eq!(first.file_size, 50);
    assert_eq!(first.file_dir, env.base_dir);
    assert!(processor.next_record(&ctx).unwrap().is_none());
}

#[test]
fn test_scan_boundary_sizes_excluded() {
    let env = TestEnv::new();
    env.write_aged("lo.bin", 10, 1_000_000);
    env.write_aged("mid.bin", 15, 1_000_000);
    env.write_aged("hi.bin", 20, 1_000_000);

    let ctx = env
        .context()
        .with_attribute("biggerThan", "10")
        .with_attribute("smallerThan", "20");
    assert_eq!(names(&scan(&ctx)), vec!["mid.bin"]);
}

#[test]
fn test_scan_not_recursive_by_default() {
    let env = TestEnv::new();
    env.write_file("top.log", b"top");
    env.write_file("nested/deep.log", b"deep");
    env.write_file("nested/more/deeper.log", b"deeper");

    let ctx = env.context().with_attribute("fileName", r"\.log$");
    assert_eq!(names(&scan(&ctx)), vec!["top.log"]);

    let ctx = ctx.with_attribute("recursive", "false");
    assert_eq!(names(&scan(&ctx)), vec!["top.log"]);

    let ctx = ctx.with_attribute("recursive", "TRUE");
    assert_eq!(names(&scan(&ctx)), vec!["deep.log", "deeper.log", "top.log"]);
}

#[test]
fn test_scan_recursive_records_point_at_subdirectories() {
    let env = TestEnv::new();
    env.write_file("nested/deep.log", b"deep");

    let ctx = env.context().with_attribute("recursive", "true");
    let records = scan(&ctx);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file_dir, env.base_dir.join("nested"));
    assert_eq!(records[0].file_absolute_path, env.base_dir.join("nested/deep.log"));
}

#[test]
fn test_exclude_pattern_precedence() {
    let env = TestEnv::new();
    env.write_file("keep.log", b"k");
    env.write_file("skip.log", b"s");

    // With a name pattern, excludes removes matches.
    let ctx = env
        .context()
        .with_attribute("fileName", r"\.log$")
        .with_attribute("excludes", "^skip");
    assert_eq!(names(&scan(&ctx)), vec!["keep.log"]);

    // Without a name pattern, excludes is not consulted at all.
    let ctx = env.context().with_attribute("excludes", "^skip");
    assert_eq!(names(&scan(&ctx)), vec!["keep.log", "skip.log"]);
}

#[test]
fn test_scan_with_variables() {
    let env = TestEnv::new();
    env.write_aged("old.csv", 100, 1_000_000);
    env.write_aged("new.csv", 100, 3_000_000);

    let mut vars = Variables::new();
    vars.insert("root", Value::Text(env.base_dir.to_string_lossy().into_owned()));
    vars.insert("ext", Value::Text("csv".to_string()));
    vars.insert(
        "lastRun",
        Value::Date(DateTime::<Utc>::from_timestamp(2_000_000, 0).unwrap()),
    );
    let attributes = BTreeMap::from([
        ("baseDir".to_string(), "${root}".to_string()),
        ("fileName".to_string(), r"\.${ext}$".to_string()),
        ("newerThan".to_string(), "${lastRun}".to_string()),
    ]);
    let ctx = EntityContext::new(attributes, Arc::new(vars));

    assert_eq!(names(&scan(&ctx)), vec!["new.csv"]);
}

#[test]
fn test_scan_from_config_file() {
    let env = TestEnv::new();
    env.write_aged("a.dat", 2048, 1_000_000);
    env.write_aged("b.dat", 16, 1_000_000);

    let toml = format!(
        r#"
[variables]
root = "{}"
minSize = 1024

[[entities]]
name = "big"

[entities.attributes]
baseDir = "${{root}}"
biggerThan = "${{minSize}}"
"#,
        env.base_dir.to_string_lossy().replace('\\', "\\\\")
    );
    let config = DredgeConfig::parse(&toml).unwrap();
    let vars = Arc::new(config.variables().unwrap());
    let ctx = config.context_for(config.entity("big").unwrap(), vars);

    assert_eq!(names(&scan(&ctx)), vec!["a.dat"]);
}

#[test]
fn test_unreadable_bound_is_fatal() {
    let env = TestEnv::new();
    env.write_file("a.txt", b"a");

    let ctx = env.context().with_attribute("biggerThan", "${undefined}");
    let mut processor = FileListProcessor::new();
    processor.init(&ctx).unwrap();
    let err = processor.next_record(&ctx).unwrap_err();
    assert!(matches!(err, DredgeError::UnresolvedVariable(_)));
    assert!(err.is_config_error());
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[test]
fn test_open_prefers_plain_file() {
    let env = TestEnv::new();
    env.write_file("a.txt", b"exact bytes \x00\x01");
    env.write_zip("archive.zip", &[("a.txt", b"shadowed")]);

    assert_eq!(read_all(&env.source(), "a.txt"), b"exact bytes \x00\x01");
}

#[test]
fn test_open_falls_back_to_archive() {
    let env = TestEnv::new();
    env.write_zip("inner/archive.zip", &[("b.txt", b"inside the zip")]);

    assert_eq!(read_all(&env.source(), "inner/b.txt"), b"inside the zip");
}

#[test]
fn test_open_missing_entry() {
    let env = TestEnv::new();
    env.write_zip("inner/archive.zip", &[("c.txt", b"c")]);

    let err = env.source().open("inner/b.txt").err().unwrap();
    let message = err.to_string();
    assert!(message.contains("b.txt"), "{}", message);
    assert!(message.contains("archive.zip"), "{}", message);
}

#[test]
fn test_open_without_archive() {
    let env = TestEnv::new();
    env.write_file("other.txt", b"o");

    let err = env.source().open("missing.txt").err().unwrap();
    assert!(matches!(err, DredgeError::NoArchive(_)));
    assert!(err.to_string().contains("No archive"));
    assert!(err.to_string().contains(&*env.base_dir.to_string_lossy()));
}

#[test]
fn test_open_reopens_archive_each_call() {
    let env = TestEnv::new();
    env.write_zip("archive.zip", &[("v.txt", b"one")]);
    let source = env.source();
    assert_eq!(read_all(&source, "v.txt"), b"one");

    env.write_zip("archive.zip", &[("v.txt", b"two")]);
    assert_eq!(read_all(&source, "v.txt"), b"two");
}

#[test]
fn test_scan_then_open_each_record() {
    let env = TestEnv::new();
    env.write_file("docs/one.txt", b"1");
    env.write_file("docs/two.txt", b"22");

    let ctx = env
        .context()
        .with_attribute("recursive", "true")
        .with_attribute("fileName", r"\.txt$");
    let source = env.source();
    for record in scan(&ctx) {
        let rel = record
            .file_absolute_path
            .strip_prefix(&env.base_dir)
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let bytes = read_all(&source, &rel);
        assert_eq!(bytes.len() as u64, record.file_size);
    }
}
