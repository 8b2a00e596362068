//! # Tipos del Sistema de Tareas
//! src/tasks/types.rs
//!
//! Define la tarea y su estado. Las tareas se copian por valor entre
//! el store, el executor y los handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Estado de una tarea
///
/// Las transiciones válidas son `Processing -> Done` y `Processing -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Tarea ejecutándose
    Processing,

    /// Tarea completada exitosamente
    Done,

    /// Tarea cancelada, expirada o con error de persistencia
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Verifica si el estado es final
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Parsea el nombre de un estado (`PROCESSING`, `done`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        [TaskStatus::Processing, TaskStatus::Done, TaskStatus::Failed]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Una tarea registrada en el sistema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// ID único (UUID v4)
    pub id: Uuid,

    /// Nombre visible
    pub name: String,

    /// Estado actual
    pub status: TaskStatus,

    /// Momento de creación (lo fija el store)
    pub created_at: DateTime<Utc>,

    /// Tiempo de procesamiento acumulado
    pub processing_time: Duration,
}

impl Task {
    /// Crea una tarea nueva en estado `Processing` con un ID aleatorio
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: TaskStatus::Processing,
            created_at: Utc::now(),
            processing_time: Duration::ZERO,
        }
    }
}
