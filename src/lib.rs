//! # File Server
//! src/lib.rs
//!
//! Servidor HTTP/1.x concurrente de archivos estáticos, implementado sobre
//! sockets bloqueantes y un pool fijo de threads.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests, escritura de responses, status y MIME
//! - `files`: Resolución segura de paths y servicio de archivos
//! - `server`: Socket de escucha, cola de conexiones, workers y apagado
//! - `config`: Configuración desde CLI y variables de entorno
//! - `logging` / `signals`: Integración con el entorno de ejecución
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use file_server::config::Config;
//! use file_server::server::Server;
//!
//! let mut config = Config::default();
//! config.document_root = "./public".into();
//!
//! let mut server = Server::bind(&config).expect("Error al abrir el socket");
//! server.run().expect("Error al ejecutar el servidor");
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod server;
pub mod signals;

pub use error::ServerError;
