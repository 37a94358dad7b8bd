mod client;
mod output;
mod protocol;
mod telemetry;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use spanwatch::{Observability, ServiceSettings};
use spanwatch_core::config::Config;
use spanwatch_core::health::HealthPolicy;
use spanwatch_core::time::TimeRange;
use spanwatch_store::{DatasetSummary, Store};

use crate::client::ApiClient;
use crate::output::{
    print_dependencies_human, print_graph_human, print_service_human, print_services_human,
    print_status_human, print_trace_human, print_traces_human,
};
use crate::protocol::{ApiRequest, ApiResponse};
use crate::telemetry::{LogFormat, init_cli_tracing, init_run_tracing, shutdown_tracing};

#[derive(Parser, Debug)]
#[command(name = "spanwatch")]
#[command(about = "Service health, dependency graph and trace browser over span data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Server address for query commands")]
    addr: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the HTTP API")]
    Run {
        #[arg(long)]
        db_path: Option<PathBuf>,
        #[arg(long)]
        http_addr: Option<String>,
        #[arg(long, help = "baseline or threshold")]
        health_policy: Option<HealthPolicy>,
        #[arg(long, help = "Load a dataset file before serving")]
        dataset: Option<PathBuf>,
    },
    #[command(about = "Load a JSON dataset of traces, spans and dependencies")]
    Load {
        file: PathBuf,
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    #[command(about = "List services with their health")]
    Services {
        #[arg(long, default_value = "1h")]
        range: TimeRange,
    },
    #[command(about = "Current vs baseline metrics and trend for one service")]
    Service {
        name: String,
        #[arg(long, default_value = "1h")]
        range: TimeRange,
    },
    #[command(about = "Inbound and outbound neighbours of a service")]
    Deps { name: String },
    #[command(about = "Dependency graph annotated with health")]
    Graph {
        #[arg(long, default_value = "1h")]
        range: TimeRange,
    },
    #[command(about = "List recent traces")]
    Traces {
        #[arg(long)]
        service: Option<String>,
        #[arg(long, default_value = "1h")]
        range: TimeRange,
    },
    #[command(about = "Per-service time breakdown of one trace")]
    Trace { trace_id: String },
    #[command(about = "Row counts and time span of the store")]
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let request = match cli.command {
        Commands::Run {
            db_path,
            http_addr,
            health_policy,
            dataset,
        } => {
            return run_server(db_path, http_addr, health_policy, dataset).await;
        }
        Commands::Load { file, db_path } => {
            init_cli_tracing();
            return run_load(file, db_path, cli.json);
        }
        Commands::Services { range } => ApiRequest::Services(range),
        Commands::Service { name, range } => ApiRequest::Service(name, range),
        Commands::Deps { name } => ApiRequest::Dependencies(name),
        Commands::Graph { range } => ApiRequest::Graph(range),
        Commands::Traces { service, range } => ApiRequest::Traces(range, service),
        Commands::Trace { trace_id } => ApiRequest::Trace(trace_id),
        Commands::Status => ApiRequest::Status,
    };

    init_cli_tracing();
    let addr = match cli.addr {
        Some(addr) => addr,
        None => Config::load().context("load config")?.http_addr,
    };
    let client = ApiClient::connect(&addr)?;
    let response = client.request(request).await?;
    print_response(response, cli.json)
}

async fn run_server(
    db_path: Option<PathBuf>,
    http_addr: Option<String>,
    health_policy: Option<HealthPolicy>,
    dataset: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut cfg = Config::load().context("load config")?;
    if let Some(v) = db_path {
        cfg.db_path = v;
    }
    if let Some(v) = http_addr {
        cfg.http_addr = v;
    }
    if let Some(v) = health_policy {
        cfg.health_policy = v;
    }

    init_run_tracing(LogFormat::from_env());

    let store = Store::open(&cfg.db_path).context("open store")?;
    if let Some(path) = dataset {
        store
            .load_dataset(&path)
            .with_context(|| format!("load dataset {}", path.display()))?;
    }
    let addr: SocketAddr = cfg
        .http_addr
        .parse()
        .with_context(|| format!("invalid http_addr {}", cfg.http_addr))?;

    eprintln!("spanwatch run");
    eprintln!("  db: {}", store.db_path());
    eprintln!("  http: {addr}");
    eprintln!("  health policy: {:?}", cfg.health_policy);
    eprintln!(
        "  query timeout: {}",
        humantime::format_duration(cfg.query_timeout)
    );

    let service = Observability::new(store, ServiceSettings::from(&cfg));
    let server = tokio::spawn(spanwatch::http::serve(service, addr));

    let result = tokio::select! {
        res = server => {
            res.context("http task join failed").and_then(|inner| inner)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            Ok(())
        }
    };

    shutdown_tracing();
    result
}

fn run_load(file: PathBuf, db_path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut cfg = Config::load().context("load config")?;
    if let Some(v) = db_path {
        cfg.db_path = v;
    }

    let store = Store::open(&cfg.db_path).context("open store")?;
    let summary = store
        .load_dataset(&file)
        .with_context(|| format!("load dataset {}", file.display()))?;
    print_load_summary(&summary, &cfg.db_path, json)
}

fn print_load_summary(summary: &DatasetSummary, db_path: &Path, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!(
            "loaded traces={} spans={} dependencies={} into {}",
            summary.traces,
            summary.spans,
            summary.dependencies,
            db_path.display()
        );
    }
    Ok(())
}

fn print_response(response: ApiResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response {
        ApiResponse::Services(v) => print_services_human(&v),
        ApiResponse::Service(v) => print_service_human(&v),
        ApiResponse::Dependencies(v) => print_dependencies_human(&v),
        ApiResponse::Graph(v) => print_graph_human(&v),
        ApiResponse::Traces(v) => print_traces_human(&v),
        ApiResponse::Trace(v) => print_trace_human(&v),
        ApiResponse::Status(v) => print_status_human(&v),
    }
    Ok(())
}
