//! # File Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor: parsea la CLI, instala logging y
//! señales, y bloquea en el accept loop hasta el apagado.

use file_server::config::Config;
use file_server::server::Server;
use file_server::{logging, signals, ServerError};
use tracing::error;

fn main() {
    let config = Config::new();
    logging::init(config.debug, config.quiet);
    config.log_summary();

    if let Err(e) = run(&config) {
        error!(error = %e, "error fatal");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), ServerError> {
    let mut server = Server::bind(config)?;

    // Antes de que exista cualquier otro thread
    signals::install(server.shutdown_handle())?;

    server.run()
}
