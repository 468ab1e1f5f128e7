//! # Señales del sistema
//! src/signals.rs
//!
//! Puente entre SIGINT/SIGTERM y el `ShutdownHandle`. Las señales se
//! bloquean en el thread principal antes de lanzar cualquier otro thread
//! (la máscara se hereda), y un thread dedicado las espera con `sigwait`.

use nix::sys::signal::{SigSet, Signal};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::error::ServerError;
use crate::server::ShutdownHandle;

/// Señales que piden un apagado ordenado
pub fn shutdown_signals() -> SigSet {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask
}

/// Bloquea las señales de apagado y lanza el thread que las atiende
///
/// Debe llamarse desde el thread principal antes de `Server::run`.
pub fn install(handle: ShutdownHandle) -> Result<JoinHandle<()>, ServerError> {
    let mask = shutdown_signals();
    mask.thread_block()?;

    let thread = thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || match mask.wait() {
            Ok(signal) => {
                info!(signal = %signal, "señal recibida");
                handle.shutdown();
            }
            Err(e) => error!(error = %e, "sigwait falló"),
        })?;

    Ok(thread)
}
