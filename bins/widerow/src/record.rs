use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use widerow_db::{json, RecordCodec, Row, RowStore, Schema, StoreConfig, TimestampMicros};

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, ClapArgs)]
pub struct Put {
    /// JSON schema description file
    #[clap(long, short = 's')]
    pub schema: PathBuf,

    /// Column family to write
    #[clap(long, short = 'f')]
    pub family: String,

    /// Row key
    #[clap(long, short = 'r')]
    pub row: String,

    /// JSON record file, or `-` for stdin
    #[clap(long, value_name = "FILE|-")]
    pub record: String,

    /// Cell timestamp in microseconds (default: now)
    #[clap(long, short = 't')]
    pub timestamp: Option<i64>,
}

#[derive(Debug, ClapArgs)]
pub struct Get {
    /// JSON schema description file
    #[clap(long, short = 's')]
    pub schema: PathBuf,

    /// Column family to read
    #[clap(long, short = 'f')]
    pub family: String,

    /// Row key
    #[clap(long, short = 'r')]
    pub row: String,
}

pub fn run_put(db_dir: &Path, args: &Put) -> Result<()> {
    trace!("Running put: {:?}", args);

    let schema = load_schema(&args.schema)?;
    let input = read_input(&args.record)?;
    let input: serde_json::Value =
        serde_json::from_str(&input).context("Record is not valid JSON")?;
    let record = json::record_from_json(&schema, &input)?;

    let timestamp = args
        .timestamp
        .map(TimestampMicros)
        .unwrap_or_else(TimestampMicros::now);
    let codec = RecordCodec::new(schema);
    let mutation = codec.to_mutation(args.row.as_bytes(), &args.family, timestamp, &record)?;

    let store = RowStore::open(db_dir, [args.family.as_str()], &StoreConfig::default())?;
    store.apply(&mutation)?;

    info!(row = %args.row, family = %args.family, cells = mutation.len(), "Wrote record");
    println!(
        "wrote {} cells to {}/{} at {}",
        mutation.len(),
        args.family,
        args.row,
        timestamp
    );
    Ok(())
}

pub fn run_get(db_dir: &Path, args: &Get) -> Result<()> {
    trace!("Running get: {:?}", args);

    let schema = load_schema(&args.schema)?;
    let store = RowStore::open_readonly(db_dir, &StoreConfig::existing_only())?;
    let row = store
        .read_row(args.row.as_bytes())?
        .unwrap_or_else(|| Row::new(args.row.as_bytes()));

    let codec = RecordCodec::new(schema);
    let resolution = codec.decode_row(&row, &args.family)?;
    let label = resolution.label();
    let record = resolution
        .into_value()
        .ok_or_else(|| anyhow::anyhow!("Row {} has no record", args.row))?;

    let output = serde_json::json!({
        "resolution": label,
        "record": json::record_to_json(codec.schema(), &record)?,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_schema(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let schema = Schema::from_json(&text)?;
    debug!(schema = schema.name(), "Loaded schema");
    Ok(schema)
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read record from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("Failed to read record {}", source))
}
