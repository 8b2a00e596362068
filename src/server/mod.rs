//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! - `tcp`: listener tokio, una tarea por conexión, shutdown ordenado
//! - `routes`: tabla de rutas y estado compartido

pub mod routes;
pub mod tcp;

pub use routes::{build_router, AppState};
pub use tcp::Server;
