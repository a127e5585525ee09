use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use bindery_api::{ReqwestTransport, validate_base_url};
use bindery_engine::{ClientBuilder, ClientConfig, LogLevel, Request, Value};
use bindery_registry::{ContractRegistry, LiveIntrospector};
use bindery_registry_gen::{DeclarationInput, write_manifest, write_manifest_json, write_recipes};
use bindery_types::{DeclarationDocument, SpecManifest};
use bindery_util::redact_header;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bindery", version, about = "Compile declared HTTP interfaces and resolve their requests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a declaration document and print the method specs as JSON
    Compile {
        /// Path to the YAML or JSON declaration document
        declarations: PathBuf,
        /// Interface to compile; repeatable. Defaults to every non-generic interface
        #[arg(long = "interface")]
        interfaces: Vec<String>,
    },
    /// Write construction recipes or spec manifests for a declaration document
    Generate {
        declarations: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value = "rust")]
        format: Format,
        #[arg(long = "interface")]
        interfaces: Vec<String>,
    },
    /// Resolve the request for one method and send it
    Request {
        declarations: PathBuf,
        /// Method identifier, e.g. `GitHub#contributors(String,String)`
        config_key: String,
        /// Arguments as a JSON array, in declaration order
        #[arg(long, default_value = "[]")]
        args: String,
        /// Overrides the configured base URL
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long, value_enum)]
        log_level: Option<LogArg>,
        /// Print the resolved request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Rust,
    Json,
    Bin,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogArg {
    None,
    Basic,
    Headers,
    Full,
}

impl From<LogArg> for LogLevel {
    fn from(value: LogArg) -> Self {
        match value {
            LogArg::None => LogLevel::None,
            LogArg::Basic => LogLevel::Basic,
            LogArg::Headers => LogLevel::Headers,
            LogArg::Full => LogLevel::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Compile {
            declarations,
            interfaces,
        } => run_compile(declarations, interfaces),
        Command::Generate {
            declarations,
            output,
            format,
            interfaces,
        } => {
            let input = DeclarationInput::from_path(declarations).with_interfaces(interfaces);
            match format {
                Format::Rust => write_recipes(input, output),
                Format::Json => write_manifest_json(input, output),
                Format::Bin => write_manifest(input, output),
            }
        }
        Command::Request {
            declarations,
            config_key,
            args,
            base_url,
            log_level,
            dry_run,
        } => run_request(declarations, &config_key, &args, base_url, log_level, dry_run).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_document(path: &PathBuf) -> Result<DeclarationDocument> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    DeclarationDocument::from_yaml(&text).with_context(|| format!("parse {}", path.display()))
}

fn run_compile(declarations: PathBuf, interfaces: Vec<String>) -> Result<()> {
    let document = load_document(&declarations)?;
    let interfaces = if interfaces.is_empty() {
        document
            .interfaces
            .iter()
            .filter(|interface| interface.type_params.is_empty())
            .map(|interface| interface.name.clone())
            .collect()
    } else {
        interfaces
    };

    let registry = ContractRegistry::with_defaults();
    let mut manifests = Vec::with_capacity(interfaces.len());
    for interface in interfaces {
        let introspector = LiveIntrospector::from_document(&document, &interface)?;
        let specs = registry
            .compile(&introspector)
            .with_context(|| format!("compile {interface}"))?;
        manifests.push(SpecManifest { interface, specs });
    }
    println!("{}", serde_json::to_string_pretty(&manifests)?);
    Ok(())
}

async fn run_request(
    declarations: PathBuf,
    config_key: &str,
    args: &str,
    base_url: Option<String>,
    log_level: Option<LogArg>,
    dry_run: bool,
) -> Result<()> {
    let interface = config_key
        .split_once('#')
        .map(|(interface, _)| interface)
        .ok_or_else(|| anyhow!("config key '{config_key}' must look like Interface#method(Types)"))?;
    let argv: Vec<Value> = serde_json::from_str(args).context("--args must be a JSON array")?;
    let document = load_document(&declarations)?;

    let mut config = ClientConfig::load();
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }
    debug!(base_url = %config.base_url, interface, "binding interface");

    let builder = ClientBuilder::from_config(&config, Arc::new(ReqwestTransport::new()));
    let table = builder.build_live(&ContractRegistry::with_defaults(), &document, interface)?;
    if table.handler(config_key).is_none() {
        let known: Vec<&str> = table.config_keys().collect();
        bail!("no method {config_key}; known methods: {}", known.join(", "));
    }

    if dry_run {
        let request = table.resolve(config_key, &argv)?;
        println!("{}", serde_json::to_string_pretty(&describe(&request))?);
        return Ok(());
    }

    validate_base_url(&config.base_url)?;
    let value = table.invoke(config_key, argv).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// JSON view of a resolved request with sensitive headers redacted.
fn describe(request: &Request) -> Value {
    let mut headers = serde_json::Map::new();
    for (name, values) in &request.headers {
        let values: Vec<Value> = values
            .iter()
            .map(|value| Value::String(redact_header(name, value)))
            .collect();
        headers.insert(name.clone(), Value::Array(values));
    }
    serde_json::json!({
        "method": request.method.as_str(),
        "url": request.url,
        "headers": headers,
        "body": request.body_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_types::HttpMethod;
    use indexmap::IndexMap;

    #[test]
    fn describe_redacts_sensitive_headers() {
        let mut headers = IndexMap::new();
        headers.insert("Authorization".to_string(), vec!["token secret".to_string()]);
        headers.insert("Accept".to_string(), vec!["application/json".to_string()]);
        let request = Request {
            method: HttpMethod::Get,
            url: "https://api.github.com/user".into(),
            headers,
            body: None,
        };
        let described = describe(&request);
        assert_eq!(described["method"], "GET");
        assert_eq!(described["headers"]["Authorization"][0], "<redacted>");
        assert_eq!(described["headers"]["Accept"][0], "application/json");
        assert!(described["body"].is_null());
    }

    #[test]
    fn cli_parses_request_flags() {
        let cli = Cli::try_parse_from([
            "bindery",
            "request",
            "api.yaml",
            "GitHub#contributors(String,String)",
            "--args",
            r#"["octo", "hello"]"#,
            "--dry-run",
            "--log-level",
            "headers",
        ])
        .expect("parse");
        match cli.command {
            Command::Request {
                config_key,
                dry_run,
                log_level,
                ..
            } => {
                assert_eq!(config_key, "GitHub#contributors(String,String)");
                assert!(dry_run);
                assert!(matches!(log_level, Some(LogArg::Headers)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
