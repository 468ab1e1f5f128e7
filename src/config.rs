//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor de archivos con soporte
//! completo para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./file_server --bind 127.0.0.1 --port 8080 \
//!   --root ./public \
//!   --workers 8 \
//!   --backlog 256
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 DOCUMENT_ROOT=/srv/www WORKERS=8 ./file_server
//! ```

use clap::Parser;
use std::fs;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::error::ServerError;
use crate::http::request::Limits;

/// Largo mínimo razonable para una línea de request
const MIN_LINE_LIMIT: usize = 16;

/// Configuración del servidor HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "file_server")]
#[command(about = "Servidor HTTP/1.x concurrente de archivos estáticos")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(short = 'b', long = "bind", default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = elegido por el sistema)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Directorio raíz desde el que se sirven los archivos
    #[arg(short = 'r', long = "root", default_value = ".", env = "DOCUMENT_ROOT")]
    pub document_root: PathBuf,

    // === Workers ===

    /// Número de threads que atienden conexiones (y capacidad de la cola)
    #[arg(short, long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Backlog del socket de escucha
    #[arg(long, default_value = "128", env = "LISTEN_BACKLOG")]
    pub backlog: i32,

    // === Límites de protocolo ===

    /// Largo máximo de la request line y de cada header (bytes)
    #[arg(long = "max-line", default_value = "65536", env = "MAX_LINE")]
    pub max_line: usize,

    /// Cantidad máxima de headers por request
    #[arg(long = "max-headers", default_value = "100", env = "MAX_HEADERS")]
    pub max_headers: usize,

    /// Archivos índice para requests a directorios, en orden de prioridad
    #[arg(
        long = "index",
        value_delimiter = ',',
        default_values = ["index.html", "index.htm"],
        env = "INDEX_FILES"
    )]
    pub index_files: Vec<String>,

    /// Timeout de lectura por conexión en segundos (0 = sin timeout)
    #[arg(long = "timeout", default_value = "0", env = "IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: u64,

    // === Logging ===

    /// Modo debug (logs detallados)
    #[arg(short, long)]
    pub debug: bool,

    /// Modo silencioso (solo warnings y errores)
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,
}

/// Errores de validación de la configuración
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("backlog must be >= 1 (got {0})")]
    InvalidBacklog(i32),

    #[error("max line must be >= 16 bytes (got {0})")]
    LineLimitTooSmall(usize),

    #[error("max headers must be >= 1")]
    NoHeaders,

    #[error("invalid index file name {0:?}")]
    InvalidIndexFile(String),
}

/// Vista inmutable de la configuración que comparten los workers
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Document root absoluto y canonicalizado
    pub root: PathBuf,

    /// Nombres de archivos índice
    pub index_files: Vec<String>,

    /// Valor del header `Server`
    pub server_name: String,

    /// Límites del parser
    pub limits: Limits,

    /// Timeout de lectura de cada conexión
    pub idle_timeout: Option<Duration>,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use file_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resuelve host y puerto a una dirección de socket
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| ServerError::Resolve(self.address()))?
            .next()
            .ok_or_else(|| ServerError::Resolve(self.address()))
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.backlog < 1 {
            return Err(ConfigError::InvalidBacklog(self.backlog));
        }
        if self.max_line < MIN_LINE_LIMIT {
            return Err(ConfigError::LineLimitTooSmall(self.max_line));
        }
        if self.max_headers == 0 {
            return Err(ConfigError::NoHeaders);
        }

        // Un índice con separadores podría salir del directorio pedido
        if let Some(name) = self
            .index_files
            .iter()
            .find(|name| name.is_empty() || name.contains(['/', '\\']) || *name == "..")
        {
            return Err(ConfigError::InvalidIndexFile(name.clone()));
        }

        Ok(())
    }

    /// Construye las opciones de servicio, resolviendo el document root
    pub fn serve_options(&self) -> Result<ServeOptions, ServerError> {
        let root_error = |source| ServerError::DocumentRoot {
            path: self.document_root.clone(),
            source,
        };

        let root = fs::canonicalize(&self.document_root).map_err(root_error)?;
        if !root.is_dir() {
            return Err(root_error(io::Error::other("not a directory")));
        }

        Ok(ServeOptions {
            root,
            index_files: self.index_files.clone(),
            server_name: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            limits: Limits {
                max_line: self.max_line,
                max_headers: self.max_headers,
            },
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
        })
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.address(),
            root = %self.document_root.display(),
            workers = self.workers,
            backlog = self.backlog,
            max_line = self.max_line,
            max_headers = self.max_headers,
            index = ?self.index_files,
            idle_timeout_secs = self.idle_timeout_secs,
            "configuración cargada"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            document_root: PathBuf::from("."),
            workers: 4,
            backlog: 128,
            max_line: 64 * 1024,
            max_headers: 100,
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            idle_timeout_secs: 0,
            debug: false,
            quiet: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.workers, 4);
        assert_eq!(config.index_files, vec!["index.html", "index.htm"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn test_parse_cli_arguments() {
        let config = Config::try_parse_from([
            "file_server",
            "-b", "127.0.0.1",
            "-p", "9000",
            "-r", "/srv/www",
            "-w", "8",
            "--backlog", "16",
            "--index", "home.html,default.htm",
            "--timeout", "30",
            "-d",
        ])
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.document_root, PathBuf::from("/srv/www"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.backlog, 16);
        assert_eq!(config.index_files, vec!["home.html", "default.htm"]);
        assert_eq!(config.idle_timeout_secs, 30);
        assert!(config.debug);
    }

    #[test]
    fn test_debug_and_quiet_conflict() {
        assert!(Config::try_parse_from(["file_server", "-d", "-q"]).is_err());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_values() {
        let mut config = Config::default();
        config.workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

        let mut config = Config::default();
        config.backlog = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBacklog(0)));

        let mut config = Config::default();
        config.max_line = 4;
        assert_eq!(config.validate(), Err(ConfigError::LineLimitTooSmall(4)));

        let mut config = Config::default();
        config.max_headers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoHeaders));
    }

    #[test]
    fn test_validate_index_names() {
        let mut config = Config::default();
        config.index_files = vec!["index.html".to_string(), "../secret".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidIndexFile("../secret".to_string()))
        );
    }

    // ==================== Serve options ====================

    #[test]
    fn test_serve_options_canonicalize_root() {
        let mut config = Config::default();
        config.document_root = std::env::temp_dir();
        config.idle_timeout_secs = 5;

        let options = config.serve_options().unwrap();
        assert!(options.root.is_absolute());
        assert_eq!(options.idle_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.limits.max_headers, 100);
        assert!(options.server_name.starts_with("file_server/"));
    }

    #[test]
    fn test_serve_options_missing_root() {
        let mut config = Config::default();
        config.document_root = PathBuf::from("/definitely/not/a/real/root");

        assert!(matches!(
            config.serve_options(),
            Err(ServerError::DocumentRoot { .. })
        ));
    }
}
