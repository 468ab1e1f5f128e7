//! # Errores del servidor
//! src/error.rs
//!
//! Errores de arranque y de ciclo de vida. Los errores por conexión
//! (`ParseError`, `ResponseError`) viven en el módulo `http` y nunca
//! salen del worker que los produjo.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::http::{ParseError, ResponseError};

/// Errores que detienen (o impiden) el arranque del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuración inválida
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// El document root no existe o no es un directorio
    #[error("document root {path:?} is not usable: {source}")]
    DocumentRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// La dirección de bind no se pudo resolver
    #[error("cannot resolve bind address {0:?}")]
    Resolve(String),

    /// No se pudo crear el socket de escucha
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Falló la instalación del manejo de señales
    #[error("signal setup failed: {0}")]
    Signal(#[from] nix::Error),

    /// Error de I/O genérico
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errores que terminan una conexión sin afectar al resto
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
