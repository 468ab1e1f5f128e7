//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Este módulo implementa el parser de requests desde cero, leyendo
//! línea por línea de un stream bufferizado (el socket del cliente).
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path/index.html HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! ```
//!
//! ## Máquina de estados
//!
//! ```text
//! AwaitingRequestLine → HeadersRead → Complete
//!          └──────────────┴──────────→ Rejected
//! ```
//!
//! Además del request, el parser decide si la conexión debe cerrarse
//! después de responder (keep-alive), según la versión negociada y el
//! header `Connection` del cliente.

use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use thiserror::Error;

use super::StatusCode;

/// Versión de protocolo con la que responde el servidor
pub const SERVER_PROTOCOL: HttpVersion = HttpVersion::HTTP_11;

/// Métodos HTTP
///
/// Solo GET y HEAD se atienden; el resto cae en `Other` y recibe 405.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un archivo
    Get,

    /// HEAD - Como GET pero sin body
    Head,

    /// Cualquier otro token (POST, DELETE, ...)
    Other(String),
}

impl Method {
    /// Parsea el primer token de la request line
    pub fn parse(word: &str) -> Self {
        if word.eq_ignore_ascii_case("GET") {
            Method::Get
        } else if word.eq_ignore_ascii_case("HEAD") {
            Method::Head
        } else {
            Method::Other(word.to_string())
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Other(word) => word,
        }
    }
}

/// Versión `HTTP/<major>.<minor>` declarada en la request line
///
/// El orden derivado compara primero `major` y luego `minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpVersion {
    pub major: u32,
    pub minor: u32,
}

impl HttpVersion {
    pub const HTTP_10: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_11: HttpVersion = HttpVersion { major: 1, minor: 1 };
    pub const HTTP_20: HttpVersion = HttpVersion { major: 2, minor: 0 };

    /// Parsea un token `HTTP/<digitos>.<digitos>`
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::request::HttpVersion;
    ///
    /// assert_eq!(HttpVersion::parse("HTTP/1.1"), Some(HttpVersion::HTTP_11));
    /// assert_eq!(HttpVersion::parse("HTTP/1"), None);
    /// assert_eq!(HttpVersion::parse("FTP/1.0"), None);
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        let number = token.strip_prefix("HTTP/")?;
        let (major, minor) = number.split_once('.')?;

        Some(HttpVersion {
            major: parse_digits(major)?,
            minor: parse_digits(minor)?,
        })
    }
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Límites de protocolo aplicados durante el parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largo máximo (en bytes, incluyendo CRLF) de cualquier línea
    pub max_line: usize,

    /// Cantidad máxima de líneas de header
    pub max_headers: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line: 64 * 1024,
            max_headers: 100,
        }
    }
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path crudo tal como llegó (con query y fragmento)
    path: String,

    /// Versión declarada; `None` para requests de dos palabras
    version: Option<HttpVersion>,

    /// Headers con nombre en minúsculas; el último valor gana
    headers: HashMap<String, String>,

    /// Si la conexión debe cerrarse después de responder
    close_connection: bool,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// La request line no tiene suficientes tokens para responder
    #[error("Malformed request line ({0:?})")]
    Malformed(String),

    /// La request line supera el límite configurado
    #[error("Request line too long (limit {0} bytes)")]
    LineTooLong(usize),

    /// El último token no es `HTTP/<major>.<minor>`
    #[error("Bad request version ({0:?})")]
    BadVersion(String),

    /// HTTP/2.0 o superior
    #[error("Invalid HTTP version ({0})")]
    UnsupportedVersion(String),

    /// Cantidad de tokens distinta de 2 o 3
    #[error("Bad request syntax ({0:?})")]
    BadSyntax(String),

    /// Una línea de header supera el límite
    #[error("Too long header line")]
    HeaderTooLong,

    /// Demasiadas líneas de header
    #[error("Too many headers")]
    TooManyHeaders,

    /// Error del socket mientras se leía
    #[error("I/O error while reading request: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// Indica si el error merece una respuesta 400 antes de cerrar
    ///
    /// Las líneas sin tokens útiles y los errores de socket solo cierran
    /// la conexión.
    pub fn sends_response(&self) -> bool {
        !matches!(self, ParseError::Malformed(_) | ParseError::Io(_))
    }

    /// Código de estado con el que se responde
    pub fn status(&self) -> StatusCode {
        StatusCode::BadRequest
    }
}

/// Estado del parser para el request en curso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    HeadersRead,
    Complete,
    Rejected,
}

/// Parser de requests reutilizable a lo largo de una conexión
#[derive(Debug)]
pub struct RequestParser {
    limits: Limits,
    state: ParseState,
    method: Option<Method>,
}

impl RequestParser {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            state: ParseState::AwaitingRequestLine,
            method: None,
        }
    }

    /// Estado alcanzado por el último llamado a `parse`
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Método del request en curso, si ya se leyó la request line
    ///
    /// Sirve para no mandar body en un error provocado por un HEAD.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Lee y parsea el siguiente request del stream
    ///
    /// # Retorna
    ///
    /// * `Ok(Some(Request))` - Request completo
    /// * `Ok(None)` - El cliente cerró la conexión (o expiró el timeout)
    /// * `Err(ParseError)` - Request rechazado
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use file_server::http::request::{Limits, Method, RequestParser};
    ///
    /// let mut raw: &[u8] = b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let mut parser = RequestParser::new(Limits::default());
    /// let request = parser.parse(&mut raw).unwrap().unwrap();
    ///
    /// assert_eq!(request.method(), &Method::Get);
    /// assert_eq!(request.path(), "/index.html");
    /// assert!(!request.close_connection());
    /// ```
    pub fn parse<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<Request>, ParseError> {
        self.state = ParseState::AwaitingRequestLine;
        self.method = None;

        let raw = match read_line(reader, self.limits.max_line) {
            Ok(raw) => raw,
            Err(e) if is_timeout(&e) => return Ok(None),
            Err(e) => return Err(self.reject(e.into())),
        };

        if raw.is_empty() {
            return Ok(None);
        }
        if raw.len() > self.limits.max_line {
            return Err(self.reject(ParseError::LineTooLong(self.limits.max_line)));
        }

        let line = decode_latin1(&raw);
        let line = line.trim_end_matches(['\r', '\n']);
        let words: Vec<&str> = line.split_whitespace().collect();

        // Sin al menos método y path no hay nada que contestar
        if words.len() < 2 {
            return Err(self.reject(ParseError::Malformed(line.to_string())));
        }

        let mut close_connection = true;
        let mut version = None;

        if words.len() >= 3 {
            let token = words[words.len() - 1];
            let Some(declared) = HttpVersion::parse(token) else {
                return Err(self.reject(ParseError::BadVersion(token.to_string())));
            };

            if declared >= HttpVersion::HTTP_11 && SERVER_PROTOCOL >= HttpVersion::HTTP_11 {
                close_connection = false;
            }
            if declared >= HttpVersion::HTTP_20 {
                let number = format!("{}.{}", declared.major, declared.minor);
                return Err(self.reject(ParseError::UnsupportedVersion(number)));
            }
            version = Some(declared);
        }

        if words.len() > 3 {
            return Err(self.reject(ParseError::BadSyntax(line.to_string())));
        }

        let method = Method::parse(words[0]);
        let mut path = words[1].to_string();
        if path.starts_with("//") {
            path = format!("/{}", path.trim_start_matches('/'));
        }
        self.method = Some(method.clone());

        let headers = match read_headers(reader, &self.limits) {
            Ok(headers) => headers,
            Err(e) => return Err(self.reject(e)),
        };
        self.state = ParseState::HeadersRead;

        match headers.get("connection").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("close") => close_connection = true,
            Some("keep-alive") if SERVER_PROTOCOL >= HttpVersion::HTTP_11 => {
                close_connection = false
            }
            _ => {}
        }

        self.state = ParseState::Complete;
        Ok(Some(Request {
            method,
            path,
            version,
            headers,
            close_connection,
        }))
    }

    fn reject(&mut self, error: ParseError) -> ParseError {
        self.state = ParseState::Rejected;
        error
    }
}

/// Lee una línea terminada en `\n` leyendo como máximo `limit + 1` bytes
fn read_line<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    reader
        .by_ref()
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut line)?;
    Ok(line)
}

fn read_headers<R: BufRead>(
    reader: &mut R,
    limits: &Limits,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();
    let mut count = 0;

    loop {
        let raw = read_line(reader, limits.max_line)?;
        if raw.len() > limits.max_line {
            return Err(ParseError::HeaderTooLong);
        }
        if raw.is_empty() || raw == b"\r\n" || raw == b"\n" {
            break;
        }

        count += 1;
        if count > limits.max_headers {
            return Err(ParseError::TooManyHeaders);
        }

        let line = decode_latin1(&raw);
        let line = line.trim_end_matches(['\r', '\n']);

        // Las líneas sin ':' se ignoran
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(headers)
}

/// ISO-8859-1: cada byte es exactamente un code point
fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl Request {
    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Obtiene el path crudo del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la versión HTTP declarada
    pub fn version(&self) -> Option<HttpVersion> {
        self.version
    }

    /// Obtiene un header específico (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Cantidad de headers distintos recibidos
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Si la conexión debe cerrarse después de esta respuesta
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    /// Si el cliente pidió explícitamente `Connection: keep-alive`
    pub fn keep_alive_requested(&self) -> bool {
        self.header("Connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[u8]) -> Result<Option<Request>, ParseError> {
        let mut reader = raw;
        RequestParser::new(Limits::default()).parse(&mut reader)
    }

    fn parse_ok(raw: &[u8]) -> Request {
        parse(raw).unwrap().unwrap()
    }

    #[test]
    fn test_parse_simple_get() {
        let request = parse_ok(b"GET / HTTP/1.1\r\n\r\n");

        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), Some(HttpVersion::HTTP_11));
        assert!(!request.close_connection());
    }

    #[test]
    fn test_http10_closes_by_default() {
        let request = parse_ok(b"GET /a.txt HTTP/1.0\r\n\r\n");
        assert!(request.close_connection());
    }

    #[test]
    fn test_http10_keep_alive_header() {
        let request = parse_ok(b"GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n");
        assert!(!request.close_connection());
        assert!(request.keep_alive_requested());
    }

    #[test]
    fn test_http11_connection_close() {
        let request = parse_ok(b"HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert_eq!(request.method(), &Method::Head);
        assert!(request.close_connection());
    }

    #[test]
    fn test_two_words_has_no_version() {
        let request = parse_ok(b"GET /legacy\r\n\r\n");
        assert_eq!(request.version(), None);
        assert!(request.close_connection());
    }

    #[test]
    fn test_other_method_is_kept() {
        let request = parse_ok(b"DELETE /index.html HTTP/1.1\r\n\r\n");
        assert_eq!(request.method(), &Method::Other("DELETE".to_string()));
    }

    #[test]
    fn test_headers_last_value_wins_and_skip_malformed() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nX-A: 1\r\nnot a header\r\nx-a: 2\r\n\r\n";
        let request = parse_ok(raw);

        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.header("X-A"), Some("2"));
        assert_eq!(request.header_count(), 2);
    }

    #[test]
    fn test_headers_end_on_bare_newline_or_eof() {
        let request = parse_ok(b"GET / HTTP/1.1\nHost: x\n\n");
        assert_eq!(request.header("Host"), Some("x"));

        let request = parse_ok(b"GET / HTTP/1.1\r\nHost: y\r\n");
        assert_eq!(request.header("Host"), Some("y"));
    }

    #[test]
    fn test_double_slash_is_reduced() {
        let request = parse_ok(b"GET //double//slashes HTTP/1.1\r\n\r\n");
        assert_eq!(request.path(), "/double//slashes");
    }

    #[test]
    fn test_empty_input_means_closed() {
        assert!(parse(b"").unwrap().is_none());
    }

    #[test]
    fn test_blank_or_single_token_line_is_malformed() {
        let err = parse(b"\r\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
        assert!(!err.sends_response());

        let err = parse(b"GARBAGE\r\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
        assert!(!err.sends_response());
    }

    #[test]
    fn test_invalid_versions() {
        for line in [
            &b"GET / HTTP/x.y\r\n\r\n"[..],
            b"GET / FTP/1.0\r\n\r\n",
            b"GET / HTTP/1\r\n\r\n",
            b"GET / HTTP/1.1.1\r\n\r\n",
            b"GET / HTTP/.1\r\n\r\n",
        ] {
            let err = parse(line).unwrap_err();
            assert!(matches!(err, ParseError::BadVersion(_)), "{:?}", err);
            assert!(err.sends_response());
        }
    }

    #[test]
    fn test_http2_is_rejected() {
        let err = parse(b"GET / HTTP/2.0\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion(ref v) if v == "2.0"));
        assert_eq!(err.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_too_many_words() {
        let err = parse(b"GET / extra HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::BadSyntax(_)));
    }

    #[test]
    fn test_request_line_too_long() {
        let limits = Limits { max_line: 16, max_headers: 10 };
        let mut raw: &[u8] = b"GET /a-very-long-path-indeed HTTP/1.1\r\n\r\n";
        let mut parser = RequestParser::new(limits);

        let err = parser.parse(&mut raw).unwrap_err();
        assert!(matches!(err, ParseError::LineTooLong(16)));
        assert_eq!(parser.state(), ParseState::Rejected);
        assert!(parser.method().is_none());
    }

    #[test]
    fn test_header_limits() {
        let limits = Limits { max_line: 32, max_headers: 2 };

        let mut raw: &[u8] = b"HEAD / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n";
        let mut parser = RequestParser::new(limits);
        let err = parser.parse(&mut raw).unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders));
        assert_eq!(parser.method(), Some(&Method::Head));

        let mut raw: &[u8] = b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n";
        let err = parser.parse(&mut raw).unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooLong));
    }

    #[test]
    fn test_exact_header_limit_is_accepted() {
        let limits = Limits { max_line: 64, max_headers: 2 };
        let mut raw: &[u8] = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n";
        let mut parser = RequestParser::new(limits);

        assert!(parser.parse(&mut raw).unwrap().is_some());
        assert_eq!(parser.state(), ParseState::Complete);
    }

    #[test]
    fn test_pipelined_requests() {
        let mut raw: &[u8] = b"GET /one HTTP/1.1\r\n\r\nHEAD /two HTTP/1.1\r\nConnection: close\r\n\r\n";
        let mut parser = RequestParser::new(Limits::default());

        let first = parser.parse(&mut raw).unwrap().unwrap();
        let second = parser.parse(&mut raw).unwrap().unwrap();

        assert_eq!(first.path(), "/one");
        assert_eq!(second.path(), "/two");
        assert!(second.close_connection());
        assert!(parser.parse(&mut raw).unwrap().is_none());
    }
}
