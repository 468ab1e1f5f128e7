//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto con el backlog configurado
//! 2. Acepta conexiones y las encola (cola acotada, con backpressure)
//! 3. Reparte las conexiones entre un pool fijo de workers
//! 4. Se apaga ordenadamente a pedido de un `ShutdownHandle`

pub mod connection;
pub mod queue;
pub mod shutdown;
pub mod tcp;
pub mod worker;

// Re-exportar para facilitar el uso
pub use shutdown::ShutdownHandle;
pub use tcp::{Server, ServerState};
