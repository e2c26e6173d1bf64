//! Neptune Supervisor - lifecycle control for `neptune-core` and `neptune-cli`.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neptune_supervisor::config::{Config, ConfigLoader};
use neptune_supervisor::handlers::{
    handle_initialize, handle_shutdown, register_supervisor_handlers,
    unregister_supervisor_handlers, ChannelRegistry, Operation, SharedManager,
};
use neptune_supervisor::ipc::{IpcClient, IpcServer};
use neptune_supervisor::supervisor::NeptuneSupervisor;

#[derive(Parser)]
#[command(
    name = "neptune-supervisor",
    about = "Supervise the neptune-core node and neptune-cli client",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to the standard search paths).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the IPC socket path.
    #[arg(short, long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the supervisor and serve its channels until interrupted.
    Serve {
        /// Do not start the processes until an `initialize` request arrives.
        #[arg(long)]
        no_autostart: bool,
    },
    /// Invoke one supervisor channel and print the response.
    Call {
        /// Operation: initialize, status, shutdown, restart, get-cookie, wallet-data.
        operation: String,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(socket) = &cli.socket {
        config.socket_path.clone_from(socket);
    }
    Ok(config)
}

/// Resolves once the process is asked to stop.
///
/// The handlers are installed before this returns, so a signal that arrives
/// while the caller is busy elsewhere is not lost.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            _ = interrupt.recv() => tracing::info!("Received SIGINT"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    })
}

async fn serve(config: Config, autostart: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stop = shutdown_signal()?;
    tokio::pin!(stop);

    let manager: SharedManager = Arc::new(Mutex::new(NeptuneSupervisor::new(
        config.supervisor.clone(),
    )));
    let registry = Arc::new(ChannelRegistry::new());
    register_supervisor_handlers(&registry, &manager);

    let server = IpcServer::new(&config.socket_path).serve_registry(Arc::clone(&registry))?;

    let mut stopped = false;
    if autostart {
        tokio::select! {
            response = handle_initialize(&manager) => {
                if let Some(error) = response.error {
                    tracing::error!(error = %error, "Initial startup failed");
                }
            }
            () = &mut stop => {
                tracing::warn!("Stop requested during startup");
                stopped = true;
            }
        }
    }

    if !stopped {
        tracing::info!(socket = %config.socket_path.display(), "Supervisor ready");
        (&mut stop).await;
    }
    tracing::info!("Shutting down");

    server.shutdown();
    unregister_supervisor_handlers(&registry);

    let response = handle_shutdown(&manager).await;
    match response.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

async fn call(config: &Config, operation: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let operation = Operation::from_name(operation)
        .ok_or_else(|| format!("Unknown operation: {operation}"))?;

    let client = IpcClient::for_config(config);
    let response = client.call(&operation.channel()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.success)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve { no_autostart } => {
            let autostart = config.autostart && !no_autostart;
            serve(config, autostart).await.map(|()| true)
        }
        Commands::Call { operation } => call(&config, &operation).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
