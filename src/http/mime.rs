//! # Tipos MIME
//! src/http/mime.rs
//!
//! Tabla estática extensión → Content-Type. Las extensiones se comparan
//! en minúsculas; lo que no aparece en la tabla es `application/octet-stream`.

use std::path::Path;

/// Tipo por defecto para extensiones desconocidas
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const EXTENSIONS: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("swf", "application/x-shockwave-flash"),
    ("gz", "application/gzip"),
    ("bz2", "application/x-bzip2"),
    ("xz", "application/x-xz"),
];

/// Obtiene el Content-Type de un archivo a partir de su extensión
///
/// # Ejemplo
/// ```
/// use file_server::http::mime::mime_type;
/// use std::path::Path;
///
/// assert_eq!(mime_type(Path::new("/www/index.HTML")), "text/html");
/// assert_eq!(mime_type(Path::new("/www/data.bin")), "application/octet-stream");
/// ```
pub fn mime_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME_TYPE;
    };
    let ext = ext.to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
