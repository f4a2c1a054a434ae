pub mod cli;
pub mod connector;
pub mod data;
pub mod dataset;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod mapper;
pub mod mapping;
pub mod plan;
pub mod profile;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands, InputArgs, OutputFormat},
    connector::ConnectionDescriptor,
    dataset::TabularDataset,
    loader::LoadResponse,
    plan::LoadPlan,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheetload", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Profile(args) => handle_profile(&args),
        Commands::Stats(args) => handle_stats(&args),
        Commands::DataTypes(args) => handle_data_types(&args),
        Commands::Plan(args) => handle_plan(&args),
        Commands::Load(args) => handle_load(&args),
        Commands::TestConnection(args) => handle_test_connection(&args),
    }
}

fn read_input(source: &InputArgs) -> Result<TabularDataset> {
    info!(
        "Reading '{}' with delimiter '{}'",
        source.input.display(),
        source
            .delimiter
            .map(printable_delimiter)
            .unwrap_or_else(|| "auto".to_string())
    );
    dataset::read_csv(
        &source.input,
        source.delimiter,
        source.input_encoding.as_deref(),
    )
    .with_context(|| format!("Reading dataset from {:?}", source.input))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output to JSON")?;
    println!("{rendered}");
    Ok(())
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let dataset = read_input(&args.source)?;
    let summary = profile::profile_dataset(&dataset, Some(args.source.input.as_path()));
    if args.format == OutputFormat::Json {
        return print_json(&summary);
    }
    println!(
        "{}: {} row(s), {} column(s), {} missing value(s)",
        summary.table_name, summary.row_count, summary.column_count, summary.total_missing_values
    );
    let headers = ["column", "dtype", "missing", "unique", "suggested", "samples"]
        .map(String::from)
        .to_vec();
    let rows = summary
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.dtype.to_string(),
                column.missing_count.to_string(),
                column.unique_count.to_string(),
                column.suggested_type.to_string(),
                column
                    .sample_values
                    .iter()
                    .map(data::Value::to_text)
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    if !summary.preview.is_empty() {
        println!();
        let preview = summary
            .preview
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| table::cell_text(cell.as_ref()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        table::print_table(&dataset.column_names(), &preview);
    }
    Ok(())
}

fn handle_stats(args: &cli::StatsArgs) -> Result<()> {
    let dataset = read_input(&args.source)?;
    let stats = profile::column_stats(&dataset, &args.column)
        .with_context(|| format!("Computing statistics for {:?}", args.source.input))?;
    if args.format == OutputFormat::Json {
        return print_json(&stats);
    }
    let mut rows = vec![
        vec!["dtype".to_string(), stats.dtype.to_string()],
        vec!["count".to_string(), stats.count.to_string()],
        vec!["missing".to_string(), stats.missing_count.to_string()],
        vec!["unique".to_string(), stats.unique_count.to_string()],
    ];
    if let Some(numeric) = &stats.numeric {
        rows.extend([
            vec!["min".to_string(), table::optional_number(Some(numeric.min))],
            vec!["max".to_string(), table::optional_number(Some(numeric.max))],
            vec!["mean".to_string(), table::optional_number(Some(numeric.mean))],
            vec!["median".to_string(), table::optional_number(Some(numeric.median))],
            vec!["std".to_string(), table::optional_number(numeric.std)],
        ]);
    }
    if let Some(lengths) = &stats.lengths {
        rows.extend([
            vec!["min_length".to_string(), lengths.min_length.to_string()],
            vec!["max_length".to_string(), lengths.max_length.to_string()],
            vec!["avg_length".to_string(), table::optional_number(Some(lengths.avg_length))],
        ]);
    }
    table::print_table(&[stats.column_name.clone(), String::new()], &rows);
    println!();
    let top = stats
        .top_values
        .iter()
        .map(|entry| vec![entry.value.clone(), entry.count.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&["value".to_string(), "count".to_string()], &top);
    Ok(())
}

fn handle_data_types(args: &cli::DataTypesArgs) -> Result<()> {
    let catalog = mapping::data_type_catalog();
    if args.format == OutputFormat::Json {
        return print_json(&catalog);
    }
    let headers = ["type", "name", "description", "formats"]
        .map(String::from)
        .to_vec();
    let rows = catalog
        .iter()
        .map(|info| {
            vec![
                info.type_id.to_string(),
                info.display_name.to_string(),
                info.description.to_string(),
                info.available_formats.join(" | "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let dataset = read_input(&args.source)?;
    let summary = profile::profile_dataset(&dataset, Some(args.source.input.as_path()));
    let mut plan = LoadPlan::from_profile(&summary, ConnectionDescriptor::sqlite(&args.database));
    if let Some(table) = &args.table {
        plan.table_name = table.clone();
    }
    plan.validate().context("Validating generated load plan")?;
    match &args.output {
        Some(path) => {
            plan.save(path)
                .with_context(|| format!("Writing load plan to {path:?}"))?;
            info!(
                "Load plan for {} column(s) written to {:?}",
                plan.columns.len(),
                path
            );
        }
        None => print!("{}", plan.to_yaml_string()?),
    }
    Ok(())
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let mut plan = LoadPlan::load(&args.plan)?;
    if let Some(table) = &args.table {
        plan.table_name = table.clone();
    }
    if let Some(policy) = args.if_exists {
        plan.if_exists = policy;
    }
    if let Some(batch_size) = args.batch_size {
        plan.batch_size = batch_size;
    }
    if let Some(database) = &args.database {
        plan.connection.database = database.clone();
    }
    plan.validate().context("Validating load plan overrides")?;
    debug!("Resolved load plan: {plan:?}");

    let dataset = read_input(&args.source)?;
    if args.report {
        print_json(&mapper::transform(&dataset, &plan.columns).report())?;
    }

    let outcome = loader::load(
        &dataset,
        &plan.connection,
        &plan.table_name,
        &plan.columns,
        &plan.options(),
    );
    let response = LoadResponse::from_outcome(outcome);
    print_json(&response)?;
    if !response.success {
        bail!("{}", response.message);
    }
    Ok(())
}

fn handle_test_connection(args: &cli::TestConnectionArgs) -> Result<()> {
    let descriptor = ConnectionDescriptor {
        db_type: args.db_type,
        host: args.host.clone(),
        port: args.port,
        database: args.database.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
    };
    descriptor
        .validate()
        .context("Validating connection settings")?;
    let mut connector = connector::connector_for(&descriptor)
        .with_context(|| format!("Preparing {} connector", descriptor.db_type))?;
    let result = connector.test_connection();
    print_json(&result)?;
    if !result.success {
        bail!("{}", result.message);
    }
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
