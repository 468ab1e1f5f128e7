//! # Manejo de una conexión
//! src/server/connection.rs
//!
//! Lleva una conexión a través de ciclos parse → dispatch → respuesta
//! hasta que el cliente cierra, el protocolo pide cerrar o falla el
//! socket. Los requests de una misma conexión se atienden en orden.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ServeOptions;
use crate::error::ConnectionError;
use crate::files;
use crate::http::{Method, ParseError, RequestParser, ResponseWriter, StatusCode};

/// Atiende una conexión completa y cierra el socket al terminar
///
/// El socket se cierra por cualquier camino de salida, incluso con error.
pub fn handle_connection(stream: TcpStream, options: &ServeOptions) -> Result<usize, ConnectionError> {
    let result = serve_stream(&stream, options);
    let _ = stream.shutdown(Shutdown::Both);
    result
}

fn serve_stream(stream: &TcpStream, options: &ServeOptions) -> Result<usize, ConnectionError> {
    stream.set_read_timeout(options.idle_timeout)?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = ResponseWriter::new(BufWriter::new(stream.try_clone()?), &options.server_name);

    let result = request_loop(&mut reader, &mut writer, options);

    // Lo que quede en el buffer se intenta mandar aunque el loop haya fallado
    if let Err(e) = writer.flush() {
        debug!(error = %e, "flush final fallido");
    }
    result
}

/// Loop de requests sobre un par lector/escritor
///
/// Retorna la cantidad de requests respondidos.
pub fn request_loop<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut ResponseWriter<W>,
    options: &ServeOptions,
) -> Result<usize, ConnectionError> {
    let mut parser = RequestParser::new(options.limits);
    let mut served = 0;

    loop {
        let request = match parser.parse(reader) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(served, "el cliente cerró la conexión");
                break;
            }
            Err(e @ ParseError::Io(_)) => return Err(e.into()),
            Err(e) => {
                if e.sends_response() {
                    writer.reset(true, parser.method() == Some(&Method::Head));
                    writer.send_error(e.status(), Some(&e.to_string()))?;
                }
                info!(error = %e, state = ?parser.state(), "request rechazado");
                break;
            }
        };

        let start = Instant::now();
        writer.reset(request.close_connection(), *request.method() == Method::Head);

        let status = match request.method() {
            Method::Get | Method::Head => files::serve(&request, writer, options)?,
            Method::Other(_) => {
                // La página de error lleva `Connection: close`: la conexión se cierra
                writer.send_error(StatusCode::MethodNotAllowed, None)?;
                StatusCode::MethodNotAllowed
            }
        };
        writer.flush()?;
        served += 1;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        if status.is_server_error() {
            warn!(method = request.method().as_str(), path = request.path(), status = status.as_u16(), latency_ms, "request con error");
        } else {
            info!(
                method = request.method().as_str(),
                path = request.path(),
                headers = request.header_count(),
                status = status.as_u16(),
                latency_ms,
                "request atendido"
            );
        }

        if writer.close_connection() {
            break;
        }
    }

    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Limits;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread;

    fn options(name: &str) -> ServeOptions {
        let root = std::env::temp_dir().join(format!("file_server_conn_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "hello").unwrap();

        ServeOptions {
            root: fs::canonicalize(&root).unwrap(),
            index_files: vec!["index.html".to_string()],
            server_name: "TestServer/1.0".to_string(),
            limits: Limits { max_line: 1024, max_headers: 4 },
            idle_timeout: None,
        }
    }

    fn cleanup(options: ServeOptions) {
        let _ = fs::remove_dir_all::<PathBuf>(options.root);
    }

    fn run(raw: &[u8], options: &ServeOptions) -> (usize, String) {
        let mut reader = raw;
        let mut writer = ResponseWriter::new(Vec::new(), "TestServer/1.0");
        let served = request_loop(&mut reader, &mut writer, options).unwrap();
        (served, String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn test_keep_alive_serves_several_requests() {
        let options = options("keepalive");
        let raw = b"GET /index.html HTTP/1.1\r\n\r\nHEAD / HTTP/1.1\r\n\r\nGET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n";

        let (served, text) = run(raw, &options);
        assert_eq!(served, 3);
        assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 3);
        assert_eq!(text.matches("hello").count(), 2);
        cleanup(options);
    }

    #[test]
    fn test_http10_closes_after_first_response() {
        let options = options("http10");
        let raw = b"GET /index.html HTTP/1.0\r\n\r\nGET /index.html HTTP/1.0\r\n\r\n";

        let (served, text) = run(raw, &options);
        assert_eq!(served, 1);
        assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 1);
        cleanup(options);
    }

    #[test]
    fn test_method_not_allowed() {
        let options = options("405");
        let (served, text) = run(b"DELETE /index.html HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n", &options);

        assert_eq!(served, 1);
        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("200 OK"));
        cleanup(options);
    }

    #[test]
    fn test_bad_version_gets_400_and_closes() {
        let options = options("400");
        let (served, text) = run(b"GET / HTTP/2.0\r\n\r\nGET / HTTP/1.1\r\n\r\n", &options);

        assert_eq!(served, 0);
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Invalid HTTP version (2.0)"));
        assert_eq!(text.matches("HTTP/1.1 ").count(), 1);
        cleanup(options);
    }

    #[test]
    fn test_garbage_line_closes_silently() {
        let options = options("garbage");
        let (served, text) = run(b"GARBAGE\r\n", &options);

        assert_eq!(served, 0);
        assert!(text.is_empty());
        cleanup(options);
    }

    #[test]
    fn test_rejected_head_has_no_error_body() {
        let options = options("headlimit");
        let raw = b"HEAD / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\nD: 4\r\nE: 5\r\n\r\n";

        let (_, text) = run(raw, &options);
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        cleanup(options);
    }

    #[test]
    fn test_handle_connection_over_tcp() {
        let options = options("tcp");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn({
            let options = options.clone();
            move || {
                let (stream, _) = listener.accept().unwrap();
                handle_connection(stream, &options).unwrap()
            }
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();

        assert!(buf.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(buf.contains("Content-Length: 5\r\n"));
        assert!(buf.ends_with("hello"));
        assert_eq!(server.join().unwrap(), 1);
        cleanup(options);
    }

    #[test]
    fn test_idle_timeout_closes_silently() {
        let mut options = options("idle");
        options.idle_timeout = Some(std::time::Duration::from_millis(200));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn({
            let options = options.clone();
            move || {
                let (stream, _) = listener.accept().unwrap();
                handle_connection(stream, &options)
            }
        });

        // Request line a medio escribir y el cliente no manda nada más
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(std::time::Duration::from_secs(5))).unwrap();
        client.write_all(b"GET / HTT").unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();

        assert!(buf.is_empty());
        assert_eq!(server.join().unwrap().unwrap(), 0);
        cleanup(options);
    }
}
