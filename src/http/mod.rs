//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Este módulo implementa el protocolo HTTP/1.x desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing de requests (request line, headers, keep-alive)
//! - Escritura de responses con buffer de headers
//! - Códigos de estado
//! - Tabla de tipos MIME
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! El servidor siempre responde con `HTTP/1.1`; los requests HTTP/2.0 o
//! superiores se rechazan con 400.

pub mod mime;      // Extensión → Content-Type
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Escritura de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Method, ParseError, Request, RequestParser};
pub use response::{ResponseError, ResponseWriter};
pub use status::StatusCode;
