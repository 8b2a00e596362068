//! # Task Server
//! src/lib.rs
//!
//! Servicio REST de tareas asíncronas. Cada tarea creada corre en
//! segundo plano un trabajo simulado de varios minutos, y puede
//! consultarse, listarse o borrarse mientras tanto.
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests y construcción de responses
//! - `router`: enrutamiento por método y patrón de path
//! - `server`: listener TCP, conexiones y shutdown
//! - `tasks`: store, contextos de ejecución, executor y coordinador
//! - `metrics`: métricas HTTP del servidor
//! - `config`: configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use task_server::config::Config;
//! use task_server::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Server::new(Config::default()).run().await
//! }
//! ```

pub mod config;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;
pub mod tasks;
