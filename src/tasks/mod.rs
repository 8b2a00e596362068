//! # Sistema de Tareas
//! src/tasks/mod.rs
//!
//! Tareas de larga duración que se procesan en segundo plano:
//!
//! - `types`: la tarea y su estado
//! - `storage`: contrato del store y store en memoria
//! - `context`: contexto de ejecución y registry de contextos vivos
//! - `executor`: loop de trabajo simulado y finalización
//! - `manager`: coordinador del ciclo de vida
//! - `handlers`: endpoints HTTP

pub mod context;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod manager;
pub mod storage;
pub mod types;

pub use context::{ContextRegistry, ExecutionContext};
pub use error::TaskError;
pub use executor::{TaskExecutor, WorkloadRange};
pub use manager::{TaskManager, TaskManagerConfig, TaskStats};
pub use storage::{InMemoryTaskStore, TaskRepository};
pub use types::{Task, TaskStatus};
