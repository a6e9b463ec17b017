//! Cat command - resolve a path through the archive-aware data source

use anyhow::{anyhow, Context, Result};
use dredge::{ArchiveFolderSource, DataSource, DredgeConfig, SourceProperties};
use dredge::resolver::{BASE_PATH, ENCODING};
use std::io::{self, Write};
use std::path::PathBuf;

/// Arguments for the cat command
#[derive(Debug)]
pub struct CatArgs {
    pub query: String,
    pub base_path: Option<PathBuf>,
    pub encoding: Option<String>,
    pub config: Option<PathBuf>,
    pub source: Option<String>,
}

/// Execute the cat command
pub fn run(args: CatArgs) -> Result<()> {
    let props = properties(&args)?;

    let mut source = ArchiveFolderSource::default();
    source.init(&props)?;
    let mut reader = source
        .open(&args.query)
        .with_context(|| format!("Failed to open '{}'", args.query))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut reader, &mut out)?;
    out.flush()?;
    source.close();
    Ok(())
}

fn properties(args: &CatArgs) -> Result<SourceProperties> {
    if let (Some(path), Some(name)) = (&args.config, &args.source) {
        let config = DredgeConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        let source = config
            .data_source(name)
            .ok_or_else(|| anyhow!("No data source named '{}' in {}", name, path.display()))?;
        return Ok(source.properties());
    }

    let mut props = SourceProperties::new();
    if let Some(base) = &args.base_path {
        props.insert(BASE_PATH.to_string(), base.to_string_lossy().into_owned());
    }
    if let Some(encoding) = &args.encoding {
        props.insert(ENCODING.to_string(), encoding.clone());
    }
    Ok(props)
}
