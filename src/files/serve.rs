//! # Servicio de archivos (GET / HEAD)
//! src/files/serve.rs
//!
//! Resuelve el path del request, elige el archivo (o el índice del
//! directorio) y escribe la respuesta. GET transmite el contenido; HEAD
//! calcula exactamente los mismos headers pero nunca manda el body.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, error};

use super::path::{has_trailing_separator, resolve};
use crate::config::ServeOptions;
use crate::http::mime::mime_type;
use crate::http::{Method, Request, ResponseError, ResponseWriter, StatusCode};

/// Responde un GET o HEAD y retorna el código enviado
pub fn serve<W: Write>(
    request: &Request,
    writer: &mut ResponseWriter<W>,
    options: &ServeOptions,
) -> Result<StatusCode, ResponseError> {
    let path = match locate(request.path(), options) {
        Ok(path) => path,
        Err(status) => {
            writer.send_error(status, None)?;
            return Ok(status);
        }
    };

    let (mut file, metadata) = match File::open(&path).and_then(|file| {
        let metadata = file.metadata()?;
        Ok((file, metadata))
    }) {
        Ok(opened) => opened,
        Err(e) => {
            // El detalle queda en el log, nunca en el body
            error!(path = %path.display(), error = %e, "no se pudo abrir el archivo");
            writer.send_error(StatusCode::InternalServerError, None)?;
            return Ok(StatusCode::InternalServerError);
        }
    };

    if metadata.is_dir() {
        writer.send_error(StatusCode::NotFound, None)?;
        return Ok(StatusCode::NotFound);
    }

    writer.begin(StatusCode::Ok)?;
    writer.header("Content-Type", mime_type(&path))?;
    writer.header("Content-Length", &metadata.len().to_string())?;
    if let Ok(modified) = metadata.modified() {
        writer.header("Last-Modified", &httpdate::fmt_http_date(modified))?;
    }
    if request.keep_alive_requested() && !request.close_connection() {
        writer.header("Connection", "keep-alive")?;
    }
    writer.end_headers()?;

    if *request.method() == Method::Get {
        io::copy(&mut file, writer.body())?;
    }

    Ok(StatusCode::Ok)
}

/// Encuentra el archivo a servir o el código de error correspondiente
fn locate(raw_path: &str, options: &ServeOptions) -> Result<PathBuf, StatusCode> {
    let mut path = resolve(raw_path, &options.root).map_err(|e| {
        debug!(path = raw_path, error = %e, "path rechazado");
        StatusCode::BadRequest
    })?;

    if path.is_dir() {
        path = options
            .index_files
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or(StatusCode::NotFound)?;
    }

    // Barra final sobre algo que no es directorio
    if has_trailing_separator(&path) || !path.exists() {
        return Err(StatusCode::NotFound);
    }

    Ok(path)
}
