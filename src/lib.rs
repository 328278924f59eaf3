pub mod cli;
pub mod dataset;
pub mod ddl;
pub mod document;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod provision;
pub mod purge;
pub mod schema;
pub mod store;
pub mod table;
pub mod types;
pub mod upload;
pub mod value;

use std::{env, io::Write, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, CsvInputArgs},
    dataset::Dataset,
    ddl::TableSpec,
    document::DocumentSchema,
    schema::SourceSchema,
    store::script::ScriptStore,
    upload::{Ingestor, LoadRequest},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ch_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Ddl(args) => handle_ddl(&args),
        Commands::Upload(args) => handle_upload(&args),
        Commands::UploadExport(args) => handle_upload_export(&args),
    }
}

fn load_dataset(
    input: &Path,
    delimiter: Option<u8>,
    encoding: Option<&str>,
    sample_rows: usize,
) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(input, delimiter);
    let encoding = io_utils::resolve_encoding(encoding)?;
    info!(
        "Reading '{}' with delimiter '{}'",
        input.display(),
        printable_delimiter(delimiter)
    );
    let dataset = Dataset::from_csv(input, delimiter, encoding, sample_rows)
        .with_context(|| format!("Reading dataset from {input:?}"))?;
    info!(
        "Read {} row(s) across {} column(s)",
        dataset.row_count(),
        dataset.columns().len()
    );
    Ok(dataset)
}

fn load_csv_args(args: &CsvInputArgs) -> Result<Dataset> {
    load_dataset(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        args.sample_rows,
    )
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let dataset = load_csv_args(&args.csv)?;
    let rows = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.dtype.to_string(),
                types::map_dtype(&column.dtype).type_name().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_table(&["#", "name", "dtype", "type"], &rows)
    );
    Ok(())
}

fn handle_ddl(args: &cli::DdlArgs) -> Result<()> {
    let source = match (&args.input, &args.document_schema) {
        (_, Some(path)) => SourceSchema::DocumentTree(DocumentSchema::load(path)?),
        (Some(input), None) => {
            let dataset = load_dataset(
                input,
                args.delimiter,
                args.input_encoding.as_deref(),
                args.sample_rows,
            )?;
            SourceSchema::from(&dataset)
        }
        (None, None) => anyhow::bail!("Either --input or --document-schema is required"),
    };
    let spec = TableSpec::new(
        &args.target.table,
        schema::build(&source),
        &args.target.order_by,
        args.target.partition_by.clone(),
    )?;
    println!("{}", ddl::generate(&spec, &args.target.database));
    Ok(())
}

fn request_from(target: &cli::TableArgs, purge_where: Option<&String>) -> LoadRequest {
    let mut request = LoadRequest::new(&target.table, &target.order_by);
    if let Some(key) = &target.partition_by {
        request = request.partition_by(key);
    }
    if let Some(predicate) = purge_where {
        request = request.purge_where(predicate);
    }
    request
}

fn script_store(database: &str, output: Option<&Path>) -> Result<ScriptStore<Box<dyn Write>>> {
    let writer = io_utils::open_output(output)?;
    debug!("Scripting statements for database '{database}'");
    Ok(ScriptStore::new(database, writer))
}

fn handle_upload(args: &cli::UploadArgs) -> Result<()> {
    let dataset = load_csv_args(&args.csv)?;
    let request = request_from(&args.target, args.purge_where.as_ref());
    let store = script_store(&args.target.database, args.output.as_deref())?;
    let mut ingestor = Ingestor::new(store);
    let count = ingestor
        .upload_dataset(dataset, &request)
        .with_context(|| format!("Uploading {:?}", args.csv.input))?;
    info!(
        "Scripted {count} row(s) for {}.{}",
        args.target.database, args.target.table
    );
    Ok(())
}

fn handle_upload_export(args: &cli::UploadExportArgs) -> Result<()> {
    let schema = DocumentSchema::load(&args.document_schema)?;
    let request = request_from(&args.target, args.purge_where.as_ref());
    let store = script_store(&args.target.database, args.output.as_deref())?;
    let mut ingestor = Ingestor::new(store);
    ingestor
        .upload_export(&schema, &args.source, &request, None)
        .with_context(|| format!("Uploading {:?}", args.source))?;
    info!(
        "Scripted export {:?} for {}.{}",
        args.source, args.target.database, args.target.table
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
