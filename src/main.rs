//! Command-line interface for cms-content

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use cms_content::item::{validate_inputs, FieldInput, Item};
#[cfg(feature = "cli")]
use cms_content::request::Request;
#[cfg(feature = "cli")]
use cms_content::schema::Schema;
#[cfg(feature = "cli")]
use cms_content::settings::Settings;
#[cfg(feature = "cli")]
use cms_content::status;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "cms-content")]
#[command(author, version, about = "Content schema inspection and validation tool", long_about = None)]
struct Cli {
    /// Settings file (JSON); defaults apply when omitted
    #[arg(long, global = true, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the fields of a schema in order
    Inspect {
        /// Path to the schema file (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check a list of raw field inputs against a schema
    Validate {
        /// Path to the schema file (JSON)
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the field inputs (JSON array)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Print the publish status of an item
    Status {
        /// Path to the item file (JSON)
        #[arg(value_name = "ITEM")]
        item: PathBuf,

        /// Path to the requests referencing the item (JSON array)
        #[arg(short, long, value_name = "REQUESTS")]
        requests: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let result = load_settings(cli.settings.as_deref()).and_then(|settings| match cli.command {
        Commands::Inspect { schema, json } => cmd_inspect(&schema, json),
        Commands::Validate { schema, input } => cmd_validate(&settings, &schema, &input),
        Commands::Status { item, requests } => cmd_status(&item, requests.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[cfg(feature = "cli")]
fn load_settings(path: Option<&Path>) -> CliResult<Settings> {
    match path {
        Some(path) => Ok(Settings::from_json_str(&fs::read_to_string(path)?)?),
        None => Ok(Settings::default()),
    }
}

#[cfg(feature = "cli")]
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e).into())
}

#[cfg(feature = "cli")]
fn cmd_inspect(schema_path: &Path, json_output: bool) -> CliResult<()> {
    use serde_json::{json, Value};

    let schema: Schema = read_json(schema_path)?;

    if json_output {
        let fields: Vec<Value> = schema
            .fields()
            .map(|field| {
                json!({
                    "id": field.id,
                    "key": field.key,
                    "title": field.title,
                    "type": field.kind().as_str(),
                    "required": field.required,
                    "unique": field.unique,
                    "multiple": field.multiple,
                    "isTitle": field.is_title,
                })
            })
            .collect();
        let output = json!({
            "id": schema.id(),
            "kind": schema.kind(),
            "fieldCount": schema.len(),
            "fields": fields,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("cms-content v{}", cms_content::VERSION);
    println!();
    println!("Schema: {} ({})", schema.id(), schema.kind());
    println!("  Fields: {}", schema.len());
    if let Some(title) = schema.title_field() {
        println!("  Title Field: {}", title.key);
    }
    println!();
    println!("=== Fields ===");
    for field in schema.fields() {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.unique {
            flags.push("unique");
        }
        if field.multiple {
            flags.push("multiple");
        }
        if field.is_title {
            flags.push("title");
        }
        if flags.is_empty() {
            println!("  {} : {}", field.key, field.kind());
        } else {
            println!("  {} : {} [{}]", field.key, field.kind(), flags.join(", "));
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_validate(settings: &Settings, schema_path: &Path, input_path: &Path) -> CliResult<()> {
    let schema: Schema = read_json(schema_path)?;
    let inputs: Vec<FieldInput> = read_json(input_path)?;

    let errors = validate_inputs(&[&schema], &settings.registry(), &inputs);

    if errors.is_empty() {
        println!("✓ Input is valid");
        Ok(())
    } else {
        println!("✗ Input is invalid");
        println!();
        println!("Errors:");
        for error in &errors {
            println!("  - {}", error);
        }
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn cmd_status(item_path: &Path, requests_path: Option<&Path>) -> CliResult<()> {
    let item: Item = read_json(item_path)?;
    let requests: Vec<Request> = match requests_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    println!("{}", status::resolve(&item, &requests));
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
