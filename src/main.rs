//! # Task Server - Entry Point
//! src/main.rs

use task_server::config::Config;
use task_server::server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    // RUST_LOG tiene prioridad sobre --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_ascii_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.print_summary();
    info!(address = %config.address(), "starting task server");

    if let Err(e) = Server::new(config).run().await {
        error!(error = %e, "fatal server error");
        std::process::exit(1);
    }
}
