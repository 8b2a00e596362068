//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ```text
//! HTTP/1.1 202 Accepted\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 123\r\n
//! Location: /api/v1/task/<id>\r\n
//! \r\n
//! {"id":"...","name":"Alpha",...}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use task_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"status":"healthy"}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

/// Body de todas las respuestas de error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Código estable legible por máquinas (`task_not_found`, `invalid_id`, ...)
    pub error: String,
    pub message: String,
}

/// Una respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    /// Ordenados por nombre para que la salida sea estable
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// Respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega (o sobrescribe) un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Fija el body y su `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Serializa `value` como JSON con el status indicado
    ///
    /// Si la serialización falla se responde 500.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body_bytes(body),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::error(
                    StatusCode::InternalServerError,
                    "internal_error",
                    "failed to serialize response",
                )
            }
        }
    }

    /// Respuesta de error: `{"error": code, "message": message}`
    pub fn error(status: StatusCode, code: &str, message: &str) -> Self {
        let body = ErrorBody {
            error: code.to_string(),
            message: message.to_string(),
        };
        // Dos strings siempre serializan
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body_bytes(bytes)
    }

    /// Convierte la respuesta a bytes para el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
