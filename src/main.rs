use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use sheet_ingest::ingest::{self, ColumnTypes};
use sheet_ingest::io::{InputFormat, InputOptions};
use sheet_ingest::{IngestError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| IngestError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => execute_convert(args),
    }
}

fn execute_convert(args: ConvertArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(IngestError::MissingInput(args.input));
    }

    let column_types = match &args.types {
        Some(path) => load_column_types(path)?,
        None => ColumnTypes::new(),
    };

    let options = InputOptions {
        format: args.format.map(InputFormat::from),
        main_sheet_name: args.main_sheet,
        timezone: args.timezone,
        encoding: args.encoding,
    };

    let converted = ingest::convert_input(&args.input, &options, &column_types)?;
    let json_string = serde_json::to_string_pretty(&converted.to_json()?)?;
    match &args.output {
        Some(path) => std::fs::write(path, json_string)?,
        None => println!("{json_string}"),
    }
    Ok(())
}

fn load_column_types(path: &Path) -> Result<ColumnTypes> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Read CSV or XLSX sheets and coerce cells into typed values."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the main sheet and every sub-sheet to typed JSON.
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Input workbook, CSV file, or directory of CSV files.
    #[arg(long)]
    input: PathBuf,

    /// Input layout; guessed from the path when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatKind>,

    /// Name of the main sheet. Defaults to the first sheet.
    #[arg(long)]
    main_sheet: Option<String>,

    /// IANA timezone used to render date/time cells.
    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Encoding of CSV files.
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// JSON object mapping column names to declared types.
    #[arg(long)]
    types: Option<PathBuf>,

    /// Output file path. Prints to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatKind {
    Csv,
    Xlsx,
}

impl From<FormatKind> for InputFormat {
    fn from(kind: FormatKind) -> Self {
        match kind {
            FormatKind::Csv => InputFormat::Csv,
            FormatKind::Xlsx => InputFormat::Xlsx,
        }
    }
}
