use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use catalog_import::config::{ImportConfig, MapperConfig, StoreConfig};
use catalog_import::import::{BatchImporter, FieldMapper, ImportDefaults, parse_export};
use catalog_import::store::HttpProductStore;

#[derive(Parser, Debug)]
#[command(
    name = "import_csv",
    about = "Parse a product export and create its products in the catalog"
)]
struct Args {
    /// Path to the CSV export to import.
    #[arg(long)]
    file: PathBuf,

    /// Publish every product (`true`) or none (`false`), overriding the export.
    #[arg(long)]
    publish: Option<bool>,

    /// Discount percent (0-100) applied to every product.
    #[arg(long)]
    discount: Option<f64>,

    /// Number of concurrent creates per batch. Defaults to `IMPORT_BATCH_SIZE`.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Parse and map only; nothing is sent to the catalog.
    #[arg(long)]
    dry_run: bool,

    /// Print the preview records as JSON.
    #[arg(long)]
    preview: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let import_config = ImportConfig::from_env();
    let mapper = FieldMapper::new(MapperConfig::from_env());

    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let input = std::fs::read(&args.file)?;

    let parsed = match parse_export(&file_name, &input, &mapper) {
        Ok(parsed) => parsed,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    };
    println!(
        "Parsed {} rows, {} products ready to import",
        parsed.rows.len(),
        parsed.records.len()
    );

    if args.preview {
        let preview: Vec<_> = parsed
            .records
            .iter()
            .take(import_config.preview_size)
            .collect();
        println!("{}", serde_json::to_string_pretty(&preview)?);
    }

    let defaults = ImportDefaults {
        default_publish: args.publish,
        default_discount: args.discount,
    };
    if let Err(err) = BatchImporter::check_preconditions(&parsed.records, &defaults) {
        writeln!(io::stderr(), "error: {err}")?;
        std::process::exit(1);
    }

    if args.dry_run {
        println!("Dry run: nothing was sent to the catalog");
        return Ok(());
    }

    let store = HttpProductStore::new(StoreConfig::from_env())?;
    let batch_size = args.batch_size.unwrap_or(import_config.batch_size).max(1);
    let importer = BatchImporter::new(Arc::new(store), batch_size);

    let summary = importer
        .import(&parsed.records, &defaults, |progress| {
            println!(
                "[{:>3}%] batch {}/{}: {} imported, {} failed",
                progress.percent,
                progress.batch,
                progress.batches,
                progress.imported,
                progress.failed
            );
        })
        .await;

    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    };

    for failure in &summary.failures {
        writeln!(
            io::stderr(),
            "failed record {} ({}): {}",
            failure.index,
            failure.primary_sku,
            failure.reason
        )?;
    }
    println!("{}", summary.message());

    if !summary.is_complete() {
        std::process::exit(1);
    }
    Ok(())
}
