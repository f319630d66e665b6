//! Prints the SQL a SensorThings request translates to.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sensorthings_query::{
    config::EngineConfig,
    model::{EntityId, EntityType},
    query::{ExpandItem, OrderBy, QueryEngine, QueryOptions, Selection},
};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "st-explain",
    version,
    about = "Show the SQL generated for a SensorThings request"
)]
struct Cli {
    #[arg(value_name = "ENTITY_SET", help = "Entity set to fetch, e.g. Datastreams")]
    target: EntityType,

    #[arg(long, conflicts_with = "via", help = "Fetch a single entity by id")]
    id: Option<EntityId>,

    #[arg(long, requires = "via_id", help = "Entity set the target is addressed through")]
    via: Option<EntityType>,

    #[arg(long, requires = "via", help = "Id of the addressing entity")]
    via_id: Option<EntityId>,

    #[arg(long, help = "$top")]
    top: Option<u64>,

    #[arg(long, help = "$skip")]
    skip: Option<u64>,

    #[arg(long, value_delimiter = ',', help = "$select properties")]
    select: Vec<String>,

    #[arg(long = "orderby", help = "$orderby term, e.g. 'name desc' (repeatable)")]
    order_by: Vec<String>,

    #[arg(long, help = "$expand path, e.g. Datastreams/Observations (repeatable)")]
    expand: Vec<String>,

    #[arg(long, help = "Also print the $count statement")]
    count: bool,

    #[arg(long, env = "ST_EXPLAIN_CONFIG", value_name = "FILE", help = "Engine config TOML")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the configured database schema")]
    schema: Option<String>,

    #[arg(long, help = "Fail on unknown properties and relations")]
    strict: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help = "Output format")]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    install_tracing_subscriber();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.schema.is_some() {
        config.schema = cli.schema.clone();
    }
    config.strict_schema |= cli.strict;
    let engine = QueryEngine::new(config);

    let selection = match (cli.id, cli.via, cli.via_id) {
        (Some(id), _, _) => Selection::ById(id),
        (None, Some(via), Some(id)) => Selection::Related { via, id },
        _ => Selection::All,
    };
    let options = build_options(&cli)?;

    let sql = engine.explain(cli.target, &selection, &options)?;
    let count_sql = if cli.count {
        engine.builder().build_count(cli.target, &selection, &options)?
    } else {
        None
    };

    match cli.format {
        OutputFormat::Text => {
            println!("{sql}");
            if let Some(count_sql) = count_sql {
                println!("{count_sql}");
            }
        }
        OutputFormat::Json => {
            let payload = json!({ "select": sql, "count": count_sql });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<QueryOptions, Box<dyn Error>> {
    let mut options = QueryOptions::new()
        .with_select(&cli.select)
        .with_count(cli.count);
    options.top = cli.top;
    options.skip = cli.skip;
    for term in &cli.order_by {
        options = options.with_order_by(OrderBy::parse(term)?);
    }
    for path in &cli.expand {
        options = options.with_expand(ExpandItem::parse(path)?);
    }
    Ok(options)
}
