use std::path::Path;

use anyhow::Result;
use clap::{Args as ClapArgs, ValueEnum};
use widerow_db::{RowStore, StoreConfig};

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// One cell per line, tab-separated
    Tsv,
    /// Aligned columns under a header
    #[default]
    Table,
}

#[derive(Debug, ClapArgs)]
pub struct Scan {
    /// Row key
    #[clap(long, short = 'r')]
    pub row: String,

    /// Only dump this column family
    #[clap(long, short = 'f')]
    pub family: Option<String>,

    /// Output format
    #[clap(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

const HEADER: [&str; 4] = ["FAMILY", "QUALIFIER", "TIMESTAMP", "VALUE"];

/// One stored cell as printed by `scan`.
struct CellLine {
    family: String,
    qualifier: String,
    timestamp: String,
    value: String,
}

impl CellLine {
    fn fields(&self) -> [&str; 4] {
        [&self.family, &self.qualifier, &self.timestamp, &self.value]
    }
}

pub fn run_families(db_dir: &Path) -> Result<()> {
    let store = RowStore::open_readonly(db_dir, &StoreConfig::existing_only())?;
    println!("Column families:");
    for family in store.families() {
        println!("  {}", family);
    }
    Ok(())
}

pub fn run_scan(db_dir: &Path, args: &Scan) -> Result<()> {
    trace!("Running scan: {:?}", args);

    let store = RowStore::open_readonly(db_dir, &StoreConfig::existing_only())?;
    if let Some(family) = &args.family {
        if !store.families().iter().any(|f| f == family) {
            anyhow::bail!("Unknown column family: {}", family);
        }
    }

    let row = store
        .read_row(args.row.as_bytes())?
        .ok_or_else(|| anyhow::anyhow!("Row not found: {}", args.row))?;

    let mut lines = Vec::new();
    for family in row.families() {
        if args.family.as_ref().is_some_and(|f| *f != family.name) {
            continue;
        }
        for column in &family.columns {
            for cell in &column.cells {
                lines.push(CellLine {
                    family: family.name.clone(),
                    qualifier: column.qualifier_lossy().into_owned(),
                    timestamp: cell.timestamp.to_string(),
                    value: to_hex(&cell.value),
                });
            }
        }
    }

    debug!(cells = lines.len(), "Scanned row");
    for line in render(&lines, args.format) {
        println!("{}", line);
    }
    Ok(())
}

fn render(lines: &[CellLine], format: OutputFormat) -> Vec<String> {
    match format {
        OutputFormat::Tsv => lines.iter().map(|line| line.fields().join("\t")).collect(),
        OutputFormat::Table => {
            if lines.is_empty() {
                return Vec::new();
            }
            let mut widths = HEADER.map(str::len);
            for line in lines {
                for (width, field) in widths.iter_mut().zip(line.fields()) {
                    *width = (*width).max(field.len());
                }
            }
            let pad = |fields: [&str; 4]| {
                let padded: Vec<String> = fields
                    .iter()
                    .zip(widths)
                    .map(|(field, width)| format!("{:width$}", field))
                    .collect();
                padded.join("  ").trim_end().to_string()
            };

            let mut out = Vec::with_capacity(lines.len() + 2);
            out.push(pad(HEADER));
            out.push(widths.map(|w| "-".repeat(w)).join("  "));
            out.extend(lines.iter().map(|line| pad(line.fields())));
            out
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
