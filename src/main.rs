//! Wufoo to SysAid bridge CLI entry point.
//!
//! Runs one webhook payload through the bridge.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wufoo_sysaid_bridge::config::{SysAidSettings, EXAMPLE_CONFIG};
use wufoo_sysaid_bridge::entry::parse_entry;
use wufoo_sysaid_bridge::ticket::TicketRequest;
use wufoo_sysaid_bridge::{Bridge, BridgeConfig, EntryFormat};

#[derive(Parser, Debug)]
#[command(name = "wufoo-sysaid-bridge")]
#[command(
    author,
    version,
    about = "Turn Wufoo form entries into SysAid web form requests"
)]
struct Args {
    /// Configuration file path (YAML or JSON)
    #[arg(short, long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Definition directory, overrides settings.definition_dir
    #[arg(long, env = "BRIDGE_DEFINITION_DIR")]
    definition_dir: Option<PathBuf>,

    /// Form hash selecting the transform definition
    #[arg(short, long)]
    form: Option<String>,

    /// Entry payload file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    entry: String,

    /// Entry payload format: auto, json or form
    #[arg(long, default_value = "auto")]
    entry_format: EntryFormat,

    /// Print the request document and form bodies instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration (and the --form definition, if given) and exit.
    #[arg(long)]
    validate: bool,
}

fn print_example_config() {
    print!("{}", EXAMPLE_CONFIG);
}

fn load_config(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}

async fn read_entry(source: &str) -> Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("Failed to read entry from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(source).with_context(|| format!("Failed to read entry file: {}", source))
    }
}

fn print_dry_run(identity: &SysAidSettings, document: &wufoo_sysaid_bridge::RequestDocument) {
    println!("{}", document.to_pretty_json());
    for (index, element) in document.requests.iter().enumerate() {
        match TicketRequest::try_from(element) {
            Ok(ticket) => println!("[{}] {}", index, ticket.encode(identity)),
            Err(e) => println!("[{}] invalid: {}", index, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if args.example_config {
        print_example_config();
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    if let Some(dir) = &args.definition_dir {
        config.settings.definition_dir = Some(dir.to_string_lossy().to_string());
    }

    let bridge = Bridge::new(config);

    if args.validate {
        if let Some(form) = &args.form {
            bridge
                .engines()
                .get_or_load(form)
                .await
                .with_context(|| format!("Invalid definition for form '{}'", form))?;
        }
        info!("Configuration is valid");
        return Ok(());
    }

    let Some(form) = args.form.as_deref() else {
        bail!("--form is required unless --example-config or --validate is given");
    };

    let payload = read_entry(&args.entry).await?;

    if args.dry_run {
        let entry = parse_entry(&payload, args.entry_format)?;
        match bridge.build(form, entry).await? {
            Some(document) => print_dry_run(bridge.dispatcher().identity(), &document),
            None => bail!("Transform failed for form '{}'", form),
        }
        return Ok(());
    }

    let report = bridge
        .submit(form, &payload, args.entry_format)
        .await
        .with_context(|| format!("Failed to process entry for form '{}'", form))?;

    info!(
        form,
        requests = report.requests,
        sent = report.sent,
        failed = report.failed,
        invalid = report.invalid,
        skipped = report.skipped,
        "Done"
    );

    Ok(())
}
