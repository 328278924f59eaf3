use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

pub const DEFAULT_DATABASE: &str = "default";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Provision ClickHouse tables from CSV datasets and warehouse exports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer column dtypes of a CSV file and show the destination column types
    Probe(ProbeArgs),
    /// Print the CREATE TABLE statement for a CSV file or a document schema
    Ddl(DdlArgs),
    /// Script table provisioning, optional purge, and insert of a CSV dataset
    Upload(UploadArgs),
    /// Script table provisioning, optional purge, and insert of a document export
    UploadExport(UploadExportArgs),
}

#[derive(Debug, Args)]
pub struct CsvInputArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of values to sample per column when inferring dtypes (0 means full scan)
    #[arg(long, default_value_t = 2000)]
    pub sample_rows: usize,
}

#[derive(Debug, Args)]
pub struct TableArgs {
    /// Destination table name
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Sort key expression for ORDER BY
    #[arg(long = "order-by")]
    pub order_by: String,
    /// Partition key expression; also replaces the sort key
    #[arg(long = "partition-by")]
    pub partition_by: Option<String>,
    /// Destination database
    #[arg(long, env = "CLICKHOUSE_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub csv: CsvInputArgs,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["input", "document_schema"])
))]
pub struct DdlArgs {
    /// Input CSV file to derive columns from
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Warehouse schema JSON describing nested/repeated fields
    #[arg(long = "document-schema")]
    pub document_schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of values to sample per column when inferring dtypes (0 means full scan)
    #[arg(long, default_value_t = 2000)]
    pub sample_rows: usize,
    #[command(flatten)]
    pub target: TableArgs,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub csv: CsvInputArgs,
    #[command(flatten)]
    pub target: TableArgs,
    /// Delete rows matching this predicate before loading
    #[arg(long = "purge-where")]
    pub purge_where: Option<String>,
    /// Output SQL script (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadExportArgs {
    /// Warehouse schema JSON describing the exported table
    #[arg(long = "document-schema")]
    pub document_schema: PathBuf,
    /// Newline-delimited JSON export to load
    #[arg(long = "source")]
    pub source: PathBuf,
    #[command(flatten)]
    pub target: TableArgs,
    /// Delete rows matching this predicate before loading
    #[arg(long = "purge-where")]
    pub purge_where: Option<String>,
    /// Output SQL script (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
