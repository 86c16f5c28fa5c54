use anyhow::{Context, Result};
use clap::Parser;
use gramseries::{apply_transformations, records_from_csv, ChartConfig};
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gramseries")]
#[command(about = "Turn chart series specs and raw records into stacked, named and colored series", long_about = None)]
struct Args {
    /// Chart config (JSON): specs, ordering, palette and overrides
    #[arg(long)]
    config: PathBuf,

    /// CSV file whose rows replace the data of the selected spec
    #[arg(long, conflicts_with = "stdin_csv")]
    csv: Option<PathBuf>,

    /// Read the CSV rows from stdin instead of a file
    #[arg(long)]
    stdin_csv: bool,

    /// Spec receiving the CSV rows (required when the config has several)
    #[arg(long)]
    spec: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config {}", args.config.display()))?;
    let mut config = ChartConfig::from_json(&text)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;

    let records = if let Some(path) = &args.csv {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV {}", path.display()))?;
        Some(records_from_csv(BufReader::new(file))?)
    } else if args.stdin_csv {
        Some(records_from_csv(io::stdin().lock()).context("Failed to read CSV from stdin")?)
    } else {
        None
    };
    if let Some(records) = records {
        config.set_spec_data(args.spec.as_deref(), records)?;
    }

    let model = apply_transformations(&config);
    let json = serde_json::to_string_pretty(&model).context("Failed to serialize series model")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
