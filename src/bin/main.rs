//! eds CLI - inspect and query result files
//!
//! Usage:
//!   eds <file> types
//!   eds <file> columns <type>
//!   eds <file> connections [<type>]
//!   eds <file> path <from> <to> [--via <type>]...
//!   eds <file> count <type> [--filter <text>]
//!   eds <file> read <type> [--filter <text>] [--properties <a,b>] [--limit <n>]
//!   eds <file> workflows [--messages]
//!   eds <file> backup
//!
//! Examples:
//!   eds study.cdResult columns ConsolidatedUnknownCompoundItem
//!   eds study.cdResult read ConsolidatedUnknownCompoundItem --filter "MolecularWeight > 300" --limit 5

use clap::{Parser, Subcommand};
use eds::catalog::Column;
use eds::config::Settings;
use eds::convert::ConverterRegistry;
use eds::{Eds, EdsResult, EntityItem, ReadOptions};
use serde_json::{json, Map, Value as JsonValue};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eds")]
#[command(about = "eds - schema-driven access to entity result files")]
#[command(version)]
struct Cli {
    /// Path to the result file
    file: PathBuf,

    /// Settings file (defaults to EDS_CONFIG, ./eds.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log SQL and catalog loading to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entity types
    Types,

    /// List the property columns of a type
    Columns {
        /// Type name or display name
        entity: String,
    },

    /// List connections, optionally only those of one type
    Connections { entity: Option<String> },

    /// Shortest chain of connected types
    Path {
        from: String,
        to: String,

        /// Types the path must pass through, in order
        #[arg(long)]
        via: Vec<String>,
    },

    /// Count matching items
    Count {
        entity: String,

        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Read items as JSON lines
    Read {
        entity: String,

        /// Filter text, e.g. "Area > 1000 ORDER BY Name"
        #[arg(short, long)]
        filter: Option<String>,

        /// Properties to read (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        properties: Option<Vec<String>>,

        /// Properties to leave out (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<String>,

        #[arg(short, long)]
        order: Option<String>,

        #[arg(long)]
        desc: bool,

        #[arg(short, long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,
    },

    /// List processing workflows as JSON lines
    Workflows {
        /// Include the message log of each workflow
        #[arg(short, long)]
        messages: bool,
    },

    /// Copy the result file to <file>_<time>.bak
    Backup,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let eds = match Eds::open(&cli.file, settings, &ConverterRegistry::new()) {
        Ok(eds) => eds,
        Err(e) => {
            eprintln!("Error opening '{}': {}", cli.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Types => cmd_types(&eds),
        Commands::Columns { entity } => cmd_columns(&eds, &entity),
        Commands::Connections { entity } => cmd_connections(&eds, entity.as_deref()),
        Commands::Path { from, to, via } => cmd_path(&eds, &from, &to, &via),
        Commands::Count { entity, filter } => eds.count(&entity, filter.as_deref()).map(|n| {
            println!("{}", n);
        }),
        Commands::Read {
            entity,
            filter,
            properties,
            exclude,
            order,
            desc,
            limit,
            offset,
        } => {
            let options = ReadOptions {
                filter,
                properties,
                exclude,
                order,
                desc,
                limit,
                offset,
            };
            cmd_read(&eds, &entity, &options)
        }
        Commands::Workflows { messages } => cmd_workflows(&eds, messages),
        Commands::Backup => eds.backup().map(|path| {
            println!("{}", path.display());
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_types(eds: &Eds) -> EdsResult<()> {
    let mut types: Vec<_> = eds.catalog().types().collect();
    types.sort_by(|a, b| a.name.cmp(&b.name));
    for ty in types {
        println!("{:<40} {:<40} {}", ty.name, ty.table_name, ty.label());
    }
    Ok(())
}

fn column_kind(column: &Column) -> String {
    if let Some(special) = &column.special {
        return special.name().to_string();
    }
    column
        .data_type
        .as_ref()
        .map(|t| t.name.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn cmd_columns(eds: &Eds, entity: &str) -> EdsResult<()> {
    let ty = eds.catalog().get_type(entity)?;
    for column in ty.columns.iter() {
        let mut flags = Vec::new();
        if let Some(rank) = column.id_order {
            flags.push(format!("id:{}", rank));
        }
        if column.is_in_view_file() {
            flags.push("view".to_string());
        }
        println!(
            "{:<32} {:<32} {:<16} {}",
            column.column_name,
            column.label(),
            column_kind(column),
            flags.join(",")
        );
    }
    Ok(())
}

fn cmd_connections(eds: &Eds, entity: Option<&str>) -> EdsResult<()> {
    match entity {
        Some(entity) => {
            for (other, connection) in eds.catalog().neighbours(entity)? {
                println!("{:<40} {}", other.name, connection.table_name);
            }
        }
        None => {
            for connection in eds.catalog().connections() {
                println!(
                    "{:<40} {:<40} {}",
                    connection.type1, connection.type2, connection.table_name
                );
            }
        }
    }
    Ok(())
}

fn cmd_path(eds: &Eds, from: &str, to: &str, via: &[String]) -> EdsResult<()> {
    let via: Vec<&str> = via.iter().map(String::as_str).collect();
    let path = eds.get_path(from, to, &via)?;
    if path.is_empty() {
        println!("no path");
    } else {
        println!("{}", path.join(" -> "));
    }
    Ok(())
}

fn item_json(item: &EntityItem) -> EdsResult<JsonValue> {
    let mut properties = Map::new();
    for property in item.properties() {
        let value = serde_json::to_value(property.value()?).unwrap_or(JsonValue::Null);
        properties.insert(property.name().to_string(), value);
    }
    Ok(json!({
        "type": item.entity_type().name,
        "properties": properties,
    }))
}

fn cmd_read(eds: &Eds, entity: &str, options: &ReadOptions) -> EdsResult<()> {
    let mut read = eds.read(entity, options)?;
    for item in read.items()? {
        println!("{}", item_json(&item?)?);
    }
    Ok(())
}

fn cmd_workflows(eds: &Eds, messages: bool) -> EdsResult<()> {
    for workflow in eds.catalog().workflows() {
        let mut value = serde_json::to_value(&**workflow).unwrap_or(JsonValue::Null);
        if !messages {
            if let Some(map) = value.as_object_mut() {
                map.remove("messages");
            }
        }
        println!("{}", value);
    }
    Ok(())
}
