//! Scan command - run file-list entities from a config file

use anyhow::{bail, Context, Result};
use dredge::{DredgeConfig, EntityConfig, EntityProcessor, FileListProcessor, FileRecord};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the scan command
#[derive(Debug)]
pub struct ScanArgs {
    pub config: PathBuf,
    pub entity: Option<String>,
    pub json: bool,
}

/// Execute the scan command
pub fn run(args: ScanArgs) -> Result<()> {
    let config = DredgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    let variables = Arc::new(config.variables()?);

    let selected: Vec<&EntityConfig> = match &args.entity {
        Some(name) => match config.entity(name) {
            Some(entity) => vec![entity],
            None => bail!("No entity named '{}' in {}", name, args.config.display()),
        },
        None => config.entities.iter().collect(),
    };
    if selected.is_empty() {
        bail!("No entities configured in {}", args.config.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entity in selected {
        let ctx = config.context_for(entity, Arc::clone(&variables));
        let mut processor = FileListProcessor::new();
        processor
            .init(&ctx)
            .with_context(|| format!("Entity '{}' failed to initialize", entity.name))?;

        while let Some(record) = processor
            .next_record(&ctx)
            .with_context(|| format!("Entity '{}' failed during scan", entity.name))?
        {
            write_record(&mut out, &entity.name, &record, args.json)?;
        }
        if let Some((examined, matched)) = processor.progress() {
            eprintln!("{}: {} of {} candidate files matched", entity.name, matched, examined);
        }
    }
    out.flush()?;
    Ok(())
}

fn write_record(out: &mut impl Write, entity: &str, record: &FileRecord, json: bool) -> Result<()> {
    if json {
        let mut row = record.to_row();
        row.insert("entity".to_string(), entity.into());
        serde_json::to_writer(&mut *out, &row)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            entity,
            record.file_absolute_path.display(),
            record.file_size,
            record.file_last_modified.to_rfc3339()
        )?;
    }
    Ok(())
}
