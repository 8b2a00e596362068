//! # Errores del Sistema de Tareas
//! src/tasks/error.rs

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errores que pueden ocurrir al operar sobre tareas
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// No existe una tarea (o contexto vivo) con ese ID
    #[error("task not found: {0}")]
    NotFound(Uuid),

    /// Colisión de ID al crear
    #[error("task already exists: {0}")]
    AlreadyExists(Uuid),

    /// Falló una escritura en el store
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Se agotó el plazo de una espera o del shutdown
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Se observó la cancelación del contexto
    #[error("task cancelled: {0}")]
    Cancelled(Uuid),

    /// El manager ya no acepta tareas nuevas
    #[error("task manager is shutting down")]
    ShuttingDown,
}

impl TaskError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }
}
