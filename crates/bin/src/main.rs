use clap::Parser;
use emberstore::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("emberstore=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let Commands::Serve(args) = cli.command;

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        require_pass: args.require_pass,
        password: args.password,
        acl_file: args.acl_file,
    };

    // A malformed user file is fatal here: the server cannot run without a
    // valid initial permission set.
    let server = Server::bind(config).await?;

    println!("emberstore listening on {}", server.local_addr());
    println!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    println!("Server shut down");
    Ok(())
}
