//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP con un pool fijo de workers. El accept
//! loop es el único productor de la cola; cada worker atiende una conexión
//! completa (con keep-alive) antes de tomar la siguiente.

use nix::sys::socket::{
    self, sockopt, AddressFamily, Backlog, SockFlag, SockType, SockaddrStorage,
};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

use crate::config::{Config, ServeOptions};
use crate::error::ServerError;
use crate::server::queue::ConnectionQueue;
use crate::server::shutdown::{ShutdownHandle, ShutdownSignal};
use crate::server::worker::{Job, Worker, WorkerContext};

/// Pausa tras un error de `accept` (por ejemplo, sin descriptores libres)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Estado del ciclo de vida del servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Socket abierto, todavía sin workers
    Listening,
    /// Accept loop en marcha
    Running,
    /// Drenando la cola y esperando a los workers
    ShuttingDown,
    /// Terminal: socket cerrado, workers terminados
    Stopped,
}

/// Servidor HTTP/1.x de archivos estáticos
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    workers: usize,
    options: Arc<ServeOptions>,
    shutdown: ShutdownSignal,
    state: ServerState,
}

impl Server {
    /// Valida la configuración, resuelve el document root y abre el socket
    ///
    /// Con puerto 0 el sistema elige uno; `local_addr` informa cuál.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        let options = config.serve_options()?;
        let addr = config.socket_addr()?;

        let listener = open_listener(addr, config.backlog)
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, backlog = config.backlog, "socket de escucha abierto");

        Ok(Self {
            listener: Some(listener),
            local_addr,
            workers: config.workers,
            options: Arc::new(options),
            shutdown: ShutdownSignal::new(),
            state: ServerState::Listening,
        })
    }

    /// Dirección efectivamente ligada
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Handle para pedir el apagado desde otro thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.shutdown.clone(), self.local_addr)
    }

    /// Atiende conexiones hasta que se pida el apagado
    ///
    /// Bloquea el thread actual. Retorna después de que todos los workers
    /// terminaron y el socket de escucha se cerró.
    pub fn run(&mut self) -> Result<(), ServerError> {
        let listener = match (self.state, self.listener.take()) {
            (ServerState::Listening, Some(listener)) => listener,
            (state, listener) => {
                self.listener = listener;
                return Err(io::Error::other(format!("server cannot run from state {state:?}")).into());
            }
        };

        let span = info_span!("server", addr = %self.local_addr);
        let _enter = span.enter();

        let queue = ConnectionQueue::new(self.workers);
        let context = WorkerContext {
            queue: queue.clone(),
            options: Arc::clone(&self.options),
            shutdown: self.shutdown.clone(),
        };

        let mut workers = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            match Worker::spawn(id, context.clone(), &span) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    stop_workers(&queue, &mut workers);
                    self.state = ServerState::Stopped;
                    return Err(e.into());
                }
            }
        }

        self.state = ServerState::Running;
        info!(workers = self.workers, root = %self.options.root.display(), "servidor listo");

        while !self.shutdown.is_set() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if self.shutdown.is_set() {
                        // La conexión que despertó a accept, o una tardía
                        drop(stream);
                        break;
                    }
                    debug!(%peer, pending = queue.len(), "conexión aceptada");
                    if let Err(job) = queue.try_push(Job::Connection(stream, peer)) {
                        debug!(%peer, "cola llena, esperando a un worker");
                        queue.push(job);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "error al aceptar conexión");
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }

        self.state = ServerState::ShuttingDown;
        info!("deteniendo workers");
        stop_workers(&queue, &mut workers);

        drop(listener);
        self.state = ServerState::Stopped;
        info!("servidor detenido");
        Ok(())
    }
}

/// Encola un `Stop` por worker, espera la barrera y junta los threads
fn stop_workers(queue: &ConnectionQueue<Job>, workers: &mut [Worker]) {
    for _ in 0..workers.len() {
        queue.push(Job::Stop);
    }
    queue.join();

    for worker in workers.iter_mut() {
        worker.join();
    }
}

/// Crea el socket de escucha con `SO_REUSEADDR` y el backlog pedido
fn open_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let family = match addr {
        SocketAddr::V4(_) => AddressFamily::Inet,
        SocketAddr::V6(_) => AddressFamily::Inet6,
    };

    let fd = socket::socket(family, SockType::Stream, SockFlag::empty(), None)?;
    socket::setsockopt(&fd, sockopt::ReuseAddr, &true)?;
    socket::bind(fd.as_raw_fd(), &SockaddrStorage::from(addr))?;
    socket::listen(&fd, Backlog::new(backlog)?)?;

    Ok(TcpListener::from(fd))
}
