//! # Coordinación del apagado
//! src/server/shutdown.rs
//!
//! `ShutdownSignal` es un booleano que se escribe una sola vez y lo leen
//! el accept loop y todos los workers. `ShutdownHandle` lo activa desde
//! cualquier thread y despierta al accept loop con una conexión local,
//! ya que `accept` no tiene otra forma de interrumpirse.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Evento de apagado (write-once, broadcast-read)
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activa el evento; retorna `true` solo la primera vez
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Indica si ya se pidió el apagado
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Handle clonable para detener un servidor en ejecución
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    signal: ShutdownSignal,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    pub(crate) fn new(signal: ShutdownSignal, local_addr: SocketAddr) -> Self {
        Self {
            signal,
            wake_addr: wake_address(local_addr),
        }
    }

    /// Pide el apagado del servidor
    ///
    /// No espera a que termine: `Server::run` retorna cuando todos los
    /// workers salieron.
    pub fn shutdown(&self) {
        if !self.signal.trigger() {
            return;
        }
        info!("apagado solicitado");

        // Desbloquear el accept loop
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            debug!(addr = %self.wake_addr, error = %e, "no se pudo despertar al accept loop");
        }
    }
}

/// Dirección a la que conectarse para despertar a `accept`
///
/// Si el socket escucha en todas las interfaces se usa loopback.
fn wake_address(local_addr: SocketAddr) -> SocketAddr {
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local_addr.port())
}
