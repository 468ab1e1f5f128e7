//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Este módulo define los códigos de estado que puede emitir el servidor
//! de archivos estáticos. Cada código trae su reason phrase y una
//! explicación por defecto que se usa en el cuerpo HTML de los errores.
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (400, 404, 405)
//! - **5xx**: Error del servidor (500)

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - El archivo existe y sigue a continuación
    Ok = 200,

    /// 400 Bad Request - Request line o headers malformados
    BadRequest = 400,

    /// 404 Not Found - Ningún archivo corresponde a la URI
    NotFound = 404,

    /// 405 Method Not Allowed - Solo se aceptan GET y HEAD
    MethodNotAllowed = 405,

    /// 500 Internal Server Error - Falló la apertura o lectura del archivo
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Explicación larga que va en el cuerpo de las páginas de error
    pub fn explanation(&self) -> &'static str {
        match self {
            StatusCode::Ok => "Request fulfilled, document follows",
            StatusCode::BadRequest => "Bad request syntax or unsupported method",
            StatusCode::NotFound => "Nothing matches the given URI",
            StatusCode::MethodNotAllowed => "Specified method is invalid for this resource",
            StatusCode::InternalServerError => "Server got itself in trouble",
        }
    }

    /// Verifica si el código indica error del servidor (5xx)
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::StatusCode;
    /// assert!(StatusCode::InternalServerError.is_server_error());
    /// assert!(!StatusCode::BadRequest.is_server_error());
    /// ```
    pub fn is_server_error(&self) -> bool {
        let code = self.as_u16();
        (500..600).contains(&code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
