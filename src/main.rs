//! MCP Server Entry Point
//!
//! Parses the command line, loads configuration and the service document,
//! builds the dispatcher and serves it on the configured transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use group_mcp_server::core::{Config, Error, McpServer, Result, TransportService, load_service};
use group_mcp_server::domains::groups::builtin_catalog;
use group_mcp_server::domains::operations::{Dispatcher, ServiceConfig, positive_seconds};

#[derive(Parser, Debug)]
#[command(name = "group-mcp-server", version)]
#[command(about = "Serve configured groups of operations as MCP tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a service document and serve its operations
    Run {
        /// Path to the service document (JSON or YAML)
        config: Option<PathBuf>,

        /// Serve only this group from the document
        #[arg(short, long)]
        group: Option<String>,

        /// Default per-call timeout in seconds
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },

    /// Load a service document and build its dispatcher without serving
    Validate {
        /// Path to the service document (JSON or YAML)
        config: Option<PathBuf>,
    },

    /// List the group types this server can instantiate
    Groups,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment (and .env) before parsing args
    let (mut config, env_warnings) = Config::load_env();
    let cli = Cli::parse();

    let debug = matches!(cli.command, Command::Run { debug: true, .. });
    if debug {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging.level);

    for warning in &env_warnings {
        warn!("{}", warning);
    }

    match cli.command {
        Command::Run {
            config: path,
            group,
            timeout,
            ..
        } => {
            if let Some(secs) = timeout {
                config.dispatch.default_timeout = positive_seconds(secs)
                    .ok_or_else(|| Error::invalid_argument("timeout", secs))?;
            }
            let path = document_path(path, &config)?;
            run(config, &path, group.as_deref()).await?;
        }
        Command::Validate { config: path } => {
            let path = document_path(path, &config)?;
            validate(&config, &path)?;
        }
        Command::Groups => list_groups(),
    }
    Ok(())
}

/// Resolve the document path from the command line or `MCP_SERVICE_CONFIG`.
fn document_path(arg: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    arg.or_else(|| config.dispatch.service_config.clone())
        .ok_or(Error::MissingDocument)
}

/// Load the document and build the dispatcher. Any failure is fatal.
fn build(config: &Config, path: &Path, group: Option<&str>) -> Result<(ServiceConfig, Dispatcher)> {
    let mut service = load_service(path)?;
    if let Some(group) = group {
        service = service
            .select_group(group)
            .ok_or_else(|| Error::GroupNotFound {
                group: group.to_string(),
                path: path.to_path_buf(),
            })?;
    }

    let dispatcher = Dispatcher::load(&builtin_catalog(), &service, config.dispatch.options())?;
    Ok((service, dispatcher))
}

async fn run(config: Config, path: &Path, group: Option<&str>) -> Result<()> {
    let (_, dispatcher) = build(&config, path, group)
        .inspect_err(|e| error!("Failed to load {}: {}", path.display(), e))?;
    let dispatcher = Arc::new(dispatcher);
    let grace = config.dispatch.shutdown_grace;
    let transport = TransportService::new(config.transport.clone());

    let server = McpServer::from_shared(Arc::new(config), dispatcher.clone());
    info!(
        "Starting {} v{} with {} operations",
        server.name(),
        server.version(),
        dispatcher.len()
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                shutdown.cancel();
            }
        }
    });

    let result = transport.run(server, shutdown.clone()).await;
    shutdown.cancel();

    if !dispatcher.shutdown(grace).await {
        warn!("Exiting with {} invocations still running", dispatcher.in_flight());
    }

    info!("Server shutting down");
    result.map_err(Error::from)
}

fn validate(config: &Config, path: &Path) -> Result<()> {
    let (service, dispatcher) = build(config, path, None)?;

    println!("Service: {}", service.name);
    if let Some(description) = &service.description {
        println!("  {}", description);
    }
    for group in &service.groups {
        println!("Group: {} (kind: {})", group.group_id, group.kind());
        for handle in dispatcher.handles().filter(|h| h.group_id() == group.group_id) {
            println!(
                "  {}  timeout={:.3}s",
                handle.qualified_name(),
                handle.timeout().as_secs_f64()
            );
        }
    }
    println!("{} operations OK", dispatcher.len());
    Ok(())
}

fn list_groups() {
    let catalog = builtin_catalog();
    for kind in catalog.kinds() {
        let Some(group) = catalog.describe(kind) else {
            continue;
        };
        println!("{}: {}", group.kind, group.description);
        for op in &group.operations {
            println!("  {}  {}", op.name(), op.description().unwrap_or(""));
        }
    }
}

/// Initialize the logging subsystem.
///
/// Logs go to stderr; stdout belongs to the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
