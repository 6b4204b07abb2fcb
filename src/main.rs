mod config;
mod output;
mod range;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;

use logtail_api::{LogApiClient, LogType, ResourceRegistry};
use logtail_logs::{
    BuildStream, EngineConfig, LogFetcher, WatchEvent, WatchSession,
};
use logtail_types::{LogFilters, ResourceRef, Severity, TimeWindow};

use config::Config;
use output::OutputFormat;
use range::RangeFlags;

/// Logtail - tail and follow resource logs
#[derive(Parser, Debug)]
#[command(name = "logtail")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Workspace (overrides BL_WORKSPACE and the config file)
    #[arg(long, short = 'w', global = true)]
    workspace: Option<String>,

    /// API base URL (overrides BL_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// View logs for a resource
    ///
    /// Resource types: sandbox (sbx), job (j, jb), agent (ag),
    /// function (fn, mcp, mcps). By default the last hour is shown; in follow
    /// mode the last 15 minutes are shown, then new lines as they arrive.
    Logs(LogsArgs),

    /// Watch a resource's recent logs until interrupted
    ///
    /// Re-queries the 15 minutes following the start of the watch every two
    /// seconds. With --stream, reads a pushed build log body instead.
    Watch(WatchArgs),
}

#[derive(clap::Args, Debug)]
struct LogsArgs {
    /// Resource type or alias
    #[arg(value_name = "RESOURCE_TYPE")]
    resource_type: String,

    #[arg(value_name = "RESOURCE_NAME")]
    resource_name: String,

    /// Follow log output (like tail -f)
    #[arg(long, short)]
    follow: bool,

    /// Time period to fetch logs (e.g. 3d, 1h, 10m, 24h)
    #[arg(long, short)]
    period: Option<String>,

    /// Start time (RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// End time (RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    #[arg(value_name = "RESOURCE_TYPE")]
    resource_type: String,

    #[arg(value_name = "RESOURCE_NAME")]
    resource_name: String,

    /// Query build logs instead of runtime logs
    #[arg(long)]
    build: bool,

    /// Read a pushed log stream from this API path instead of polling
    #[arg(long, value_name = "PATH")]
    stream: Option<String>,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Severity levels, comma separated: FATAL,ERROR,WARNING,INFO,DEBUG,TRACE,UNKNOWN
    #[arg(long)]
    severity: Option<String>,

    /// Only lines containing this text
    #[arg(long)]
    search: Option<String>,

    /// Filter by task ID (jobs only)
    #[arg(long)]
    task_id: Option<String>,

    /// Filter by execution ID (jobs only)
    #[arg(long)]
    execution_id: Option<String>,
}

impl FilterArgs {
    fn to_filters(&self) -> Result<LogFilters> {
        let mut filters = LogFilters::default();
        if let Some(severity) = &self.severity {
            filters = filters.with_severities(
                Severity::parse_list(severity).map_err(anyhow::Error::msg)?,
            );
        }
        if let Some(search) = &self.search {
            filters = filters.with_search(search);
        }
        if let Some(task_id) = &self.task_id {
            filters = filters.with_task_id(task_id);
        }
        if let Some(execution_id) = &self.execution_id {
            filters = filters.with_execution_id(execution_id);
        }
        Ok(filters)
    }
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Hide timestamps
    #[arg(long)]
    no_timestamps: bool,

    /// Show timestamps in UTC instead of local time
    #[arg(long)]
    utc: bool,
}

impl OutputArgs {
    fn format(&self) -> OutputFormat {
        OutputFormat {
            timestamps: !self.no_timestamps,
            utc: self.utc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load()?
        .with_env()
        .with_flags(args.api_url, args.workspace);

    match args.command {
        Command::Logs(logs) => run_logs(&config, logs).await,
        Command::Watch(watch) => run_watch(&config, watch).await,
    }
}

/// Resolve the resource and build a client for it
fn connect(
    config: &Config,
    resource_type: &str,
    resource_name: &str,
) -> Result<(Arc<LogApiClient>, ResourceRef)> {
    let registry = ResourceRegistry::builtin();
    let kind = registry.canonical_kind(resource_type)?;
    let resource = ResourceRef::new(config.workspace()?, kind, resource_name);

    let client = LogApiClient::new(config.client_config(), config.credentials(), registry)
        .context("failed to create API client")?;
    Ok((Arc::new(client), resource))
}

async fn run_logs(config: &Config, args: LogsArgs) -> Result<()> {
    let (client, resource) = connect(config, &args.resource_type, &args.resource_name)?;
    let filters = args.filters.to_filters()?;
    let format = args.output.format();

    let flags = RangeFlags {
        period: args.period,
        start: args.start,
        end: args.end,
    };
    let (start, end) = range::resolve_range(&flags, args.follow, Utc::now())?;

    if args.follow {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session =
            WatchSession::sliding(client, resource, filters, start, EngineConfig::default(), tx)?;
        session.start()?;

        let interrupted = print_events(rx, format).await;
        session.shutdown().await;
        if interrupted? {
            eprintln!("\nStopped following logs.");
        }
        return Ok(());
    }

    let window = TimeWindow::new(start, end)?;
    let fetcher = LogFetcher::new(client, resource, window, filters, EngineConfig::default())?;
    let logs = fetcher.fetch_logs().await?;

    if logs.is_empty() {
        println!("No logs found for the specified time range and filters.");
        return Ok(());
    }
    for entry in &logs {
        println!("{}", format.format(entry));
    }
    Ok(())
}

async fn run_watch(config: &Config, args: WatchArgs) -> Result<()> {
    let (client, resource) = connect(config, &args.resource_type, &args.resource_name)?;
    let format = args.output.format();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Some(path) = &args.stream {
        let response = client.open_stream(path, &resource.workspace).await?;
        let mut stream = BuildStream::from_response(resource.to_string(), response, tx);
        stream.start()?;

        let interrupted = print_events(rx, format).await;
        stream.stop();
        stream.wait().await;
        if interrupted? {
            eprintln!("\nStopped watching logs.");
        }
        return Ok(());
    }

    let log_type = if args.build { LogType::Build } else { LogType::All };
    let mut session = WatchSession::bounded(
        client,
        resource,
        args.filters.to_filters()?,
        EngineConfig::default().with_log_type(log_type),
        tx,
    )?;
    session.start()?;

    let interrupted = print_events(rx, format).await;
    session.shutdown().await;
    if interrupted? {
        eprintln!("\nStopped watching logs.");
    }
    Ok(())
}

/// Print events until the session ends or Ctrl+C; returns whether interrupted
async fn print_events(
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    format: OutputFormat,
) -> Result<bool> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => return Ok(true),

            event = rx.recv() => match event {
                Some(WatchEvent::Log(entry)) => println!("{}", format.format(&entry)),
                Some(WatchEvent::Warning(msg)) => eprintln!("Warning: {}", msg),
                Some(WatchEvent::Fatal(msg)) => anyhow::bail!(msg),
                Some(WatchEvent::Completed) | None => return Ok(false),
            },
        }
    }
}
