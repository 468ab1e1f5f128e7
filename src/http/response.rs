//! # Escritura de Respuestas HTTP
//! src/http/response.rs
//!
//! El `ResponseWriter` acumula la status line y los headers en un buffer
//! ordenado y los escribe de una sola vez con `end_headers`, antes de
//! cualquier byte del body.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: file_server/0.1.0\r\n
//! Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 120\r\n
//! \r\n
//! <html>...
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use file_server::http::{ResponseWriter, StatusCode};
//!
//! let mut writer = ResponseWriter::new(Vec::new(), "file_server/0.1.0");
//! writer.begin(StatusCode::Ok).unwrap();
//! writer.header("Content-Length", "5").unwrap();
//! writer.end_headers().unwrap();
//! writer.body().extend_from_slice(b"hello");
//! ```

use std::io::{self, Write};
use std::time::SystemTime;
use thiserror::Error;

use super::request::SERVER_PROTOCOL;
use super::StatusCode;

/// Content-Type de las páginas de error
pub const ERROR_CONTENT_TYPE: &str = "text/html;charset=utf-8";

const ERROR_TEMPLATE: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">
<html>
    <head>
        <meta http-equiv="Content-Type" content="text/html;charset=utf-8">
        <title>Error</title>
    </head>
    <body>
        <h1>{code}</h1>
        <p>{message}.</p>
        <p>{code} - {explain}.</p>
    </body>
</html>
"#;

/// Errores al escribir una respuesta
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Un header contiene caracteres fuera de ISO-8859-1
    #[error("header is not encodable as latin-1: {0:?}")]
    Encoding(String),

    /// Error del socket
    #[error("I/O error while writing response: {0}")]
    Io(#[from] io::Error),
}

/// Escribe respuestas sobre una conexión
#[derive(Debug)]
pub struct ResponseWriter<W: Write> {
    /// Stream de salida (normalmente un `BufWriter<TcpStream>`)
    out: W,

    /// Status line + headers pendientes de `end_headers`
    headers_buffer: Vec<u8>,

    /// Valor del header `Server`
    server_name: String,

    /// Si la conexión se cierra después de la respuesta actual
    close_connection: bool,

    /// El request en curso es HEAD: nunca se escribe body de error
    head_only: bool,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(out: W, server_name: &str) -> Self {
        Self {
            out,
            headers_buffer: Vec::new(),
            server_name: server_name.to_string(),
            close_connection: true,
            head_only: false,
        }
    }

    /// Prepara el writer para responder a un nuevo request
    pub fn reset(&mut self, close_connection: bool, head_only: bool) {
        self.headers_buffer.clear();
        self.close_connection = close_connection;
        self.head_only = head_only;
    }

    /// Si la conexión debe cerrarse después de la respuesta actual
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    /// Escribe la status line y los headers `Server` y `Date` en el buffer
    pub fn begin(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        let status_line = format!("{} {}\r\n", SERVER_PROTOCOL, status);
        self.headers_buffer.extend(encode_latin1(&status_line)?);

        let server_name = self.server_name.clone();
        self.header("Server", &server_name)?;
        self.header("Date", &httpdate::fmt_http_date(SystemTime::now()))?;
        Ok(())
    }

    /// Agrega un header al buffer
    ///
    /// Un header `Connection` también actualiza la decisión de cierre,
    /// para que la conexión haga lo que la respuesta anuncia.
    pub fn header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let line = format!("{}: {}\r\n", name, value);
        self.headers_buffer.extend(encode_latin1(&line)?);

        if name.eq_ignore_ascii_case("connection") {
            if value.eq_ignore_ascii_case("close") {
                self.close_connection = true;
            } else if value.eq_ignore_ascii_case("keep-alive") {
                self.close_connection = false;
            }
        }
        Ok(())
    }

    /// Escribe status line + headers + línea vacía en una sola escritura
    pub fn end_headers(&mut self) -> io::Result<()> {
        self.headers_buffer.extend_from_slice(b"\r\n");
        let result = self.out.write_all(&self.headers_buffer);
        self.headers_buffer.clear();
        result
    }

    /// Stream para el body; solo válido después de `end_headers`
    pub fn body(&mut self) -> &mut W {
        &mut self.out
    }

    /// Envía una página de error completa y marca la conexión para cierre
    ///
    /// Si el request era HEAD se envían solo los headers.
    pub fn send_error(
        &mut self,
        status: StatusCode,
        explanation: Option<&str>,
    ) -> Result<(), ResponseError> {
        let content = ERROR_TEMPLATE
            .replace("{code}", &status.as_u16().to_string())
            .replace("{message}", status.reason_phrase())
            .replace("{explain}", explanation.unwrap_or(status.explanation()));

        self.headers_buffer.clear();
        self.begin(status)?;
        self.header("Connection", "close")?;
        self.header("Content-Type", ERROR_CONTENT_TYPE)?;
        self.header("Content-Length", &content.len().to_string())?;
        self.end_headers()?;

        if !self.head_only {
            self.out.write_all(content.as_bytes())?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Vacía el buffer de salida hacia el socket
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Devuelve el stream subyacente
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Codifica texto de headers como ISO-8859-1 estricto
///
/// # Ejemplo
/// ```
/// use file_server::http::response::encode_latin1;
///
/// assert_eq!(encode_latin1("Caf\u{e9}").unwrap(), b"Caf\xe9");
/// assert!(encode_latin1("\u{263a}").is_err());
/// ```
pub fn encode_latin1(text: &str) -> Result<Vec<u8>, ResponseError> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| ResponseError::Encoding(text.to_string())))
        .collect()
}
