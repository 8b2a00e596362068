//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Solo los códigos que la API de tareas realmente emite:
//!
//! - **2xx**: 200, 202 (tarea aceptada), 204 (tarea borrada)
//! - **4xx**: 400, 404, 405
//! - **5xx**: 500, 503 (shutdown en curso)

/// Códigos de estado que soporta el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 202 Accepted - La tarea se creó y corre en segundo plano
    Accepted = 202,

    /// 204 No Content - Éxito sin body
    NoContent = 204,

    /// 400 Bad Request - ID o body inválidos
    BadRequest = 400,

    /// 404 Not Found - Ruta o tarea inexistente
    NotFound = 404,

    /// 405 Method Not Allowed - La ruta existe pero no con ese método
    MethodNotAllowed = 405,

    /// 500 Internal Server Error
    InternalServerError = 500,

    /// 503 Service Unavailable - El servidor se está apagando
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Valor numérico del código
    ///
    /// ```
    /// use task_server::http::StatusCode;
    /// assert_eq!(StatusCode::Accepted.as_u16(), 202);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::Accepted.as_u16(), 202);
        assert_eq!(StatusCode::NoContent.as_u16(), 204);
        assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
        assert_eq!(StatusCode::ServiceUnavailable.as_u16(), 503);
    }

    #[test]
    fn test_server_error_category() {
        assert!(StatusCode::InternalServerError.is_server_error());
        assert!(StatusCode::ServiceUnavailable.is_server_error());
        assert!(!StatusCode::MethodNotAllowed.is_server_error());
        assert!(!StatusCode::NotFound.is_server_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::Accepted.to_string(), "202 Accepted");
        assert_eq!(StatusCode::MethodNotAllowed.to_string(), "405 Method Not Allowed");
    }
}
