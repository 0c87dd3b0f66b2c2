// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use route_scanner::{scan_project, Framework, ScanOptions, TracingSink};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "route-scanner",
    version,
    about = "Statically discovers HTTP API routes in a JavaScript / TypeScript project and prints them as JSON"
)]
struct Cli {
    /// Root of the project to scan
    /// e.g. `--project-root ./my-next-app`
    #[arg(short = 'r', long = "project-root", value_name = "DIR")]
    project_root: PathBuf,

    /// TOML file with scan options
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run an extractor even when package.json does not mention its framework
    #[arg(long = "framework", value_name = "NAME")]
    frameworks: Vec<Framework>,

    /// Regex for callee names treated as RPC router factories
    #[arg(long = "router-pattern", value_name = "REGEX")]
    router_pattern: Option<String>,

    /// Additional RPC router factory name (repeatable)
    #[arg(long = "factory", value_name = "NAME")]
    factories: Vec<String>,

    /// Mount point of the RPC handler
    #[arg(long = "rpc-endpoint", value_name = "PATH")]
    rpc_endpoint: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log extraction details to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> Result<ScanOptions> {
        let mut options = match &self.config {
            Some(path) => ScanOptions::load(path)
                .with_context(|| format!("loading scan options from {}", path.display()))?,
            None => ScanOptions::default(),
        };
        options.frameworks.force.extend(self.frameworks.iter().copied());
        options.rpc.factory_names.extend(self.factories.iter().cloned());
        if let Some(pattern) = &self.router_pattern {
            options.rpc.router_pattern = Some(pattern.clone());
        }
        if let Some(endpoint) = &self.rpc_endpoint {
            options.rpc.endpoint = endpoint.clone();
        }
        Ok(options)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "route_scanner=debug"
    } else {
        "route_scanner=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = cli.options()?;
    let routes = scan_project(&cli.project_root, &options, &TracingSink)
        .with_context(|| format!("scanning {}", cli.project_root.display()))?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&routes)?
    } else {
        serde_json::to_string(&routes)?
    };
    println!("{json}");
    Ok(())
}
