//! # Traducción de URLs a rutas del filesystem
//! src/files/path.rs
//!
//! Convierte el path de un request (controlado por el cliente) en una ruta
//! absoluta que siempre queda dentro del document root.
//!
//! Pasos:
//! 1. Cortar query string (`?`) y fragmento (`#`)
//! 2. Decodificar escapes `%XX` con `percent-encoding`
//! 3. Normalizar `.` / `..` / separadores duplicados
//! 4. Descartar segmentos vacíos, `.`, `..` o con separadores
//! 5. Unir lo que queda al root, conservando la barra final si la había
//!
//! La normalización trabaja sobre el path ya decodificado: `%2e%2e`
//! cuenta como `..`.

use percent_encoding::percent_decode_str;
use std::path::{is_separator, Path, PathBuf};
use thiserror::Error;

/// Errores de traducción de paths
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Los bytes decodificados no forman UTF-8 válido
    #[error("request path is not valid UTF-8 after percent-decoding")]
    InvalidUtf8,
}

/// Traduce el path de un request a una ruta bajo `root`
///
/// `root` debe ser absoluto y estar ya resuelto (canonicalizado).
///
/// # Ejemplo
/// ```
/// use file_server::files::path::resolve;
/// use std::path::Path;
///
/// let root = Path::new("/srv/www");
/// let path = resolve("/%2e%2e/%2e%2e/etc/passwd", root).unwrap();
/// assert_eq!(path, Path::new("/srv/www/etc/passwd"));
/// ```
pub fn resolve(raw: &str, root: &Path) -> Result<PathBuf, PathError> {
    let path = raw.split_once('?').map_or(raw, |(path, _)| path);
    let path = path.split_once('#').map_or(path, |(path, _)| path);
    let trailing_slash = path.trim_end().ends_with('/');

    // Los escapes mal formados quedan literales
    let decoded = String::from_utf8(percent_decode_str(path).collect())
        .map_err(|_| PathError::InvalidUtf8)?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut resolved = root.to_path_buf();
    for segment in segments {
        if segment.contains(['\\', '\0']) {
            continue;
        }
        resolved.push(segment);
    }
    if trailing_slash {
        // push("") agrega el separador final
        resolved.push("");
    }

    Ok(resolved)
}

/// Indica si la ruta termina en separador (semántica de directorio)
pub fn has_trailing_separator(path: &Path) -> bool {
    path.to_string_lossy().ends_with(is_separator)
}
