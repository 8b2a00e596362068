//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementación mínima de HTTP/1.x sobre la que corre la API:
//!
//! - Parsing de requests (método, path, query, headers, body)
//! - Construcción de responses con body JSON
//! - Códigos de estado
//!
//! Cada conexión atiende un único request y se cierra
//! (`Connection: close`), así que no hay keep-alive ni chunked encoding.

pub mod request;
pub mod response;
pub mod status;

pub use request::{head_len, Method, ParseError, Request};
pub use response::{ErrorBody, Response};
pub use status::StatusCode;
