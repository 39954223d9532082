use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use catalog_client::{DeregisterOutcome, RegisterOutcome, Registration, RegistryClient};

/// Service catalog command-line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Registry host
    #[arg(short = 'H', long)]
    host: String,

    /// Registry port
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register this host (or the given address) under a service name
    Register {
        #[arg(short, long)]
        name: String,

        /// Node id (defaults to this machine's identity)
        #[arg(short = 'I', long = "id")]
        node_id: Option<String>,

        /// IP address or hostname (defaults to this host)
        #[arg(short = 'A', long)]
        address: Option<String>,

        /// Service port (defaults to 8080)
        #[arg(short = 'P', long = "service-port")]
        service_port: Option<u16>,

        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Remove a node from a service
    Deregister {
        #[arg(short, long)]
        name: String,

        /// Node id (defaults to this machine's identity)
        #[arg(short = 'I', long = "id")]
        node_id: Option<String>,
    },

    /// List registered services
    List,

    /// Show the nodes of one service
    Details {
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    initialize_logging(args.verbose)?;

    let client = RegistryClient::from_host(&args.host, args.port);
    debug!("Using registry at {}", client.base_url());

    match args.command {
        Command::Register {
            name,
            node_id,
            address,
            service_port,
            description,
        } => {
            let registration = Registration {
                name,
                description,
                address,
                port: service_port,
                node_id,
            };
            match client.register(registration).await? {
                RegisterOutcome::Created => println!("service added"),
                RegisterOutcome::AlreadyExists => println!("service already exists"),
            }
        }

        Command::Deregister { name, node_id } => match client.deregister(&name, node_id).await? {
            DeregisterOutcome::Removed => println!("service removed"),
            DeregisterOutcome::NotFound => {
                eprintln!("service not found");
                return Ok(ExitCode::FAILURE);
            }
        },

        Command::List => {
            let services = client.list_services().await?;
            print_json(&services)?;
        }

        Command::Details { name } => match client.service_details(&name).await? {
            Some(details) => print_json(&details)?,
            None => {
                eprintln!("service name not found");
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format response")?;
    println!("{}", text);
    Ok(())
}

fn initialize_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
