use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig, ServerError};
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "50051")]
    port: u16,
    /// Maximum number of live matches
    #[clap(short, long, default_value = "1024")]
    max_matches: usize,
    /// Per-connection packet queue capacity
    #[clap(short, long, default_value = "32")]
    queue_capacity: usize,
    /// Seconds a match may sit with no attached client before removal
    #[clap(short, long, default_value = "300")]
    idle_timeout_secs: u64,
}

/// Parses command-line arguments, then runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    env_logger::init();

    let args = Args::parse();

    let config = ServerConfig {
        max_matches: args.max_matches,
        queue_capacity: args.queue_capacity,
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
