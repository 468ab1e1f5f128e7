//! # Logging
//! src/logging.rs
//!
//! Instala el subscriber de `tracing` una sola vez, al arrancar.
//! `RUST_LOG` tiene prioridad sobre `--debug` / `--quiet`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filtro por defecto según los flags de la CLI
pub fn default_directive(debug: bool, quiet: bool) -> &'static str {
    match (debug, quiet) {
        (true, _) => "file_server=debug",
        (false, true) => "file_server=warn",
        (false, false) => "file_server=info",
    }
}

/// Instala el subscriber global (fmt + EnvFilter)
pub fn init(debug: bool, quiet: bool) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(debug, quiet).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();
}
