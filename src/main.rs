use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use trip_importer::config::{ImporterConfig, parse_delimiter};
use trip_importer::error::ImportError;
use trip_importer::import::{ImportRun, ImportSummary, ZoneConverter};
use trip_importer::store::{PgTripStore, run_migrations};

#[derive(Parser, Debug)]
#[command(
    name = "trip-import",
    about = "Validate, deduplicate and load a trip CSV file into PostgreSQL"
)]
struct Args {
    /// Path of the CSV file to import.
    #[arg(env = "TRIPS_CSV_FILE_PATH")]
    csv_file_path: Option<PathBuf>,

    /// PostgreSQL connection string (defaults to DATABASE_URL).
    #[arg(long)]
    database_url: Option<String>,

    /// Rows per bulk insert.
    #[arg(long, allow_negative_numbers = true)]
    batch_size: Option<i64>,

    /// Field delimiter of the input file (single character or `tab`).
    #[arg(long)]
    delimiter: Option<String>,

    /// IANA time zone the input timestamps are recorded in.
    #[arg(long)]
    timezone: Option<String>,

    /// Where to write rows dropped as duplicates.
    #[arg(long)]
    duplicates_path: Option<PathBuf>,

    /// Do not apply pending schema migrations before importing.
    #[arg(long)]
    skip_migrations: bool,

    /// Print the final summary as JSON.
    #[arg(long)]
    summary_json: bool,
}

impl Args {
    fn apply(&self, config: &mut ImporterConfig) -> Result<(), ImportError> {
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(delimiter) = &self.delimiter {
            config.reader.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(timezone) = &self.timezone {
            config.source_timezone = timezone.clone();
        }
        if let Some(path) = &self.duplicates_path {
            config.duplicates_path = Some(path.clone());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    trip_importer::init_logger();

    let args = Args::parse();
    let mut inserted = 0;

    let result = run(&args, &mut inserted).await;
    if let Err(err) = &result {
        log::error!("import failed: {}", err);
        eprintln!("error: {err}");
    }

    println!("Inserted {inserted} trips.");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(args: &Args, inserted: &mut usize) -> Result<(), ImportError> {
    let mut config = ImporterConfig::from_env()?;
    args.apply(&mut config)?;

    let csv_path = args
        .csv_file_path
        .clone()
        .ok_or_else(|| ImportError::config("csv file path must be provided"))?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| ImportError::config("DATABASE_URL must be set"))?;
    config.batch_size()?;
    let converter = ZoneConverter::from_name(&config.source_timezone)?;

    log::info!(
        "importing {} (batch size {}, source zone {})",
        csv_path.display(),
        config.batch_size,
        converter.zone()
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&database_url)
        .await
        .map_err(|err| ImportError::config(format!("cannot reach database: {err}")))?;

    if !args.skip_migrations {
        run_migrations(&pool).await?;
    }

    let store = PgTripStore::acquire(&pool).await?;
    let mut import_run = ImportRun::new(config, store, converter)?;

    let outcome = import_run.import(&csv_path).await;
    *inserted = import_run.inserted();
    let summary = outcome?;

    report(&summary, args.summary_json);
    Ok(())
}

fn report(summary: &ImportSummary, as_json: bool) {
    println!(
        "Read {} rows: {} inserted, {} duplicates, {} rejected.",
        summary.total_rows, summary.inserted, summary.duplicates, summary.rejected
    );
    if let Some(path) = &summary.duplicates_file {
        println!("Wrote {} duplicates to: {}", summary.duplicates, path.display());
    }

    if !summary.errors.is_empty() {
        println!("Errors occurred:");
        for err in &summary.errors {
            println!("  - {err}");
        }
    }
    for warning in &summary.warnings {
        log::warn!("{}", warning);
    }

    if as_json {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{json}"),
            Err(err) => log::warn!("failed to serialize summary: {}", err),
        }
    }
}
