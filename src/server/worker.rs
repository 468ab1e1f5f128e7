//! # Pool de workers
//! src/server/worker.rs
//!
//! Threads de larga vida que toman conexiones de la cola compartida y
//! las atienden de principio a fin. Un worker sale cuando recibe un
//! `Job::Stop`; el servidor encola uno por worker al apagarse.

use std::any::Any;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info_span, warn, Span};

use crate::config::ServeOptions;
use crate::server::connection::handle_connection;
use crate::server::queue::ConnectionQueue;
use crate::server::shutdown::ShutdownSignal;

/// Unidad de trabajo de la cola
#[derive(Debug)]
pub enum Job {
    /// Conexión aceptada, con la dirección del cliente
    Connection(TcpStream, SocketAddr),

    /// Centinela de fin: el worker que lo toma termina
    Stop,
}

/// Contexto compartido por todos los workers
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: ConnectionQueue<Job>,
    pub options: Arc<ServeOptions>,
    pub shutdown: ShutdownSignal,
}

/// Un thread del pool
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Lanza un worker nuevo
    ///
    /// `parent` es el span del servidor; los logs del worker cuelgan de él.
    pub fn spawn(id: usize, context: WorkerContext, parent: &Span) -> io::Result<Self> {
        let span = info_span!(parent: parent, "worker", id);

        let handle = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || {
                let _enter = span.enter();
                worker_loop(&context);
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Espera a que el thread termine
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = self.id, "el worker terminó con pánico");
            }
        }
    }
}

fn worker_loop(context: &WorkerContext) {
    debug!("worker iniciado");

    loop {
        match context.queue.pop() {
            Job::Stop => {
                context.queue.task_done();
                break;
            }
            Job::Connection(stream, peer) => {
                if context.shutdown.is_set() {
                    // Encolada antes del apagado pero nunca atendida
                    debug!(%peer, "conexión descartada por apagado");
                    let _ = stream.shutdown(Shutdown::Both);
                } else {
                    process(stream, peer, &context.options);
                }
                context.queue.task_done();
            }
        }
    }

    debug!("worker terminado");
}

/// Atiende una conexión aislando sus fallas del resto del pool
fn process(stream: TcpStream, peer: SocketAddr, options: &ServeOptions) {
    let _span = info_span!("connection", %peer).entered();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle_connection(stream, options)));

    match outcome {
        Ok(Ok(served)) => debug!(served, "conexión cerrada"),
        Ok(Err(e)) => debug!(error = %e, "conexión abortada"),
        Err(payload) => warn!(panic = panic_message(&*payload), "pánico atendiendo la conexión"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Limits;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn context(capacity: usize) -> WorkerContext {
        WorkerContext {
            queue: ConnectionQueue::new(capacity),
            options: Arc::new(ServeOptions {
                root: std::fs::canonicalize(std::env::temp_dir()).unwrap(),
                index_files: vec!["index.html".to_string()],
                server_name: "TestServer/1.0".to_string(),
                limits: Limits::default(),
                idle_timeout: None,
            }),
            shutdown: ShutdownSignal::new(),
        }
    }

    fn connected_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        (client, server, peer)
    }

    #[test]
    fn test_worker_exits_on_stop() {
        let context = context(2);
        let mut worker = Worker::spawn(0, context.clone(), &Span::none()).unwrap();

        context.queue.push(Job::Stop);
        context.queue.join();
        worker.join();
        assert_eq!(worker.id(), 0);
    }

    #[test]
    fn test_worker_serves_connection() {
        let context = context(2);
        let mut worker = Worker::spawn(1, context.clone(), &Span::none()).unwrap();

        let (mut client, server, peer) = connected_pair();
        client.write_all(b"DELETE / HTTP/1.1\r\n\r\n").unwrap();
        context.queue.push(Job::Connection(server, peer));

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 405 "));

        context.queue.push(Job::Stop);
        context.queue.join();
        worker.join();
    }

    #[test]
    fn test_worker_drops_connections_after_shutdown() {
        let context = context(2);
        context.shutdown.trigger();

        let (mut client, server, peer) = connected_pair();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        context.queue.push(Job::Connection(server, peer));
        context.queue.push(Job::Stop);

        let mut worker = Worker::spawn(2, context.clone(), &Span::none()).unwrap();
        context.queue.join();
        worker.join();

        let mut response = Vec::new();
        let _ = client.read_to_end(&mut response);
        assert!(response.is_empty());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(&*payload), "unknown");
    }
}
