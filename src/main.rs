//! haprobe - query a load balancer's administrative control socket.
//!
//! Sends one command to a Unix domain socket or TCP control endpoint and
//! prints the raw reply. Designed to be called from monitoring agents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::{style, Color, Stylize};
use haprobe::{
    parse_invocation, ClientConfig, ClientError, Command, Config, Endpoint, Invocation,
    ItemRequest, ReadMode, ITEMS,
};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "haprobe")]
#[command(author, version, about = "Query a load balancer's admin control socket")]
#[command(long_about = "Sends one command to the control socket and prints the raw reply.\n\n\
    haprobe /run/haproxy/admin.sock \"show stat\"\n\
    haprobe 127.0.0.1 9999 \"show stat\"")]
struct Cli {
    /// `<SOCKET> <COMMAND>` or `<IPV4> <PORT> <COMMAND>`; just `<COMMAND>` with --unix/--tcp
    #[arg(value_name = "ARGS")]
    args: Vec<String>,

    /// Connect to this Unix domain socket
    #[arg(short = 'U', long, value_name = "PATH", conflicts_with = "tcp")]
    unix: Option<PathBuf>,

    /// Connect to this TCP endpoint (hostnames are resolved)
    #[arg(short = 'T', long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Deadline for each of connect, write and read (0 disables it)
    #[arg(long, value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    /// Read buffer size in bytes
    #[arg(long, value_name = "BYTES", global = true)]
    buffer_size: Option<NonZeroUsize>,

    /// Keep reading until the peer closes instead of a single read.
    /// Without --timeout-ms this waits for as long as the peer stays connected
    #[arg(long, global = true)]
    read_to_end: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a monitoring item key, e.g. haproxy.stat.csv[/run/haproxy/admin.sock]
    Item {
        /// Item key with parameters
        key: String,
    },
    /// List supported item keys
    Items {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let invocation = match &cli.command {
        Some(Commands::Items { json }) => return handle_items(*json),
        Some(Commands::Item { key }) => ItemRequest::parse(key).and_then(|req| req.invocation()),
        None => resolve_invocation(&cli),
    };

    // Usage errors are reported before any configuration is read.
    let invocation = match invocation {
        Ok(invocation) => invocation,
        Err(e) => fail(&e),
    };

    let client_config = client_config(&cli)?;
    handle_query(invocation, &client_config).await
}

/// Initialize logging on stderr. Stdout only ever carries the reply.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("haprobe=warn")),
        1 => EnvFilter::new("haprobe=debug"),
        _ => EnvFilter::new("haprobe=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Work out the endpoint and command from positional arguments and flags.
fn resolve_invocation(cli: &Cli) -> Result<Invocation, ClientError> {
    let endpoint = match (&cli.unix, &cli.tcp) {
        (Some(path), _) => Endpoint::local(path.clone())?,
        (None, Some(addr)) => Endpoint::parse_host_port(addr)?,
        (None, None) => return parse_invocation(&cli.args),
    };

    match cli.args.as_slice() {
        [command] => Ok(Invocation {
            endpoint,
            command: Command::new(command.as_str()),
        }),
        args => Err(ClientError::InvalidParameterCount {
            got: args.len(),
            expected: "1 (command) with --unix or --tcp",
        }),
    }
}

/// Merge the configuration file with command-line overrides.
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    let mut client = config.client;
    if let Some(timeout_ms) = cli.timeout_ms {
        client.timeout_ms = timeout_ms;
    }
    if let Some(buffer_size) = cli.buffer_size {
        client.buffer_size = buffer_size;
    }
    if cli.read_to_end {
        client.read_mode = ReadMode::ToEnd;
    }
    debug!(?client, "client configuration");
    Ok(client)
}

/// Run one exchange and print the reply.
async fn handle_query(invocation: Invocation, config: &ClientConfig) -> Result<()> {
    let response = match haprobe::query(&invocation.endpoint, &invocation.command, config).await {
        Ok(response) => response,
        Err(e) => fail(&e),
    };

    if response.may_be_truncated() {
        warn!(
            bytes = response.len(),
            "reply filled the read buffer and may be truncated; use --read-to-end or a larger --buffer-size"
        );
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(response.as_bytes())
        .context("Failed to write reply to stdout")?;
    stdout.flush()?;
    Ok(())
}

/// Handle the items subcommand.
fn handle_items(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ITEMS)?);
        return Ok(());
    }

    println!("Supported Items");
    println!("===============\n");
    for item in ITEMS {
        println!(
            "  {}\n    command: {}\n    {}\n",
            item.key, item.command, item.description
        );
    }

    println!("Usage:");
    println!("  haprobe item 'haproxy.stat.csv[/run/haproxy/admin.sock]'");
    println!("  haprobe item 'haproxy.info.text[127.0.0.1, 9999]'");

    Ok(())
}

/// Print the error category and exit: 2 for bad arguments, 1 for socket failures.
fn fail(err: &ClientError) -> ! {
    let message = format!("Error: {}: {}", err.category(), err);
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{}", style(message).with(Color::Red));
    } else {
        eprintln!("{}", message);
    }
    std::process::exit(if err.is_usage_error() { 2 } else { 1 });
}
