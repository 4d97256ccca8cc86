//! RPC Dispatch Server - JSON-RPC 2.0 over HTTP.
//!
//! Serves the demo `math` namespace through the dispatch engine and prints
//! the bound port on stdout so a parent process can find it.

mod handler;
mod methods;
mod server;

use anyhow::Result;
use clap::Parser;
use rpc_dispatch::{DispatchOptions, Dispatcher, RegistryBuilder};
use server::ServerOptions;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rpc-dispatch-server")]
#[command(version)]
#[command(about = "JSON-RPC 2.0 server backed by rpc-dispatch")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Attach error names and stacks to responses (default: on unless RPC_ENV=production)
    #[arg(long)]
    development: Option<bool>,

    /// Separator between namespace and method name
    #[arg(long, default_value = ".")]
    separator: String,

    /// Path prefix for the RPC route, e.g. /api serves /api/rpc
    #[arg(long, default_value = "")]
    route_prefix: String,

    /// Allow cross-origin requests
    #[arg(long)]
    cors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting RPC dispatch server");

    let mut options = DispatchOptions::default().separator(args.separator);
    if let Some(development) = args.development {
        options = options.development(development);
    }
    info!("Development mode: {}", options.development);

    let registry = RegistryBuilder::from_options(&options)
        .methods(methods::math_methods())
        .build()?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), options));

    // Start the server
    let addr = server::start_server(
        dispatcher,
        ServerOptions {
            host: args.host,
            port: args.port,
            route_prefix: args.route_prefix,
            cors: args.cors,
            ..ServerOptions::default()
        },
    )
    .await?;

    // Print port for the parent process to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
