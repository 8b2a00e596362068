//! # Almacenamiento de Tareas
//! src/tasks/storage.rs
//!
//! Define el contrato del store (`TaskRepository`) y una implementación
//! en memoria. Cada lectura y escritura intercambia copias independientes,
//! así que nadie puede mutar el estado guardado a través de una referencia.
//!
//! El store en memoria usa `DashMap`: el lock es por shard, no global,
//! y el reemplazo de un registro es atómico por clave.

use crate::tasks::error::TaskError;
use crate::tasks::types::{Task, TaskStatus};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Contrato de persistencia de tareas
///
/// Cualquier backend con atomicidad por clave puede implementarlo.
pub trait TaskRepository: Send + Sync {
    /// Guarda una tarea nueva y fija su `created_at`
    fn create(&self, task: &Task) -> Result<(), TaskError>;

    /// Obtiene una copia de la tarea
    fn get_by_id(&self, id: Uuid) -> Result<Task, TaskError>;

    /// Reemplaza la tarea guardada
    fn update(&self, task: &Task) -> Result<(), TaskError>;

    /// Elimina la tarea
    fn delete(&self, id: Uuid) -> Result<(), TaskError>;

    /// Copias de todas las tareas, sin orden garantizado
    fn get_all(&self) -> Result<Vec<Task>, TaskError>;

    /// Número de tareas guardadas
    fn count(&self) -> usize {
        self.get_all().map(|tasks| tasks.len()).unwrap_or(0)
    }

    /// Copias de las tareas con un estado dado
    fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, TaskError> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|task| task.status == status)
            .collect())
    }
}

/// Store en memoria de tareas
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskRepository for InMemoryTaskStore {
    fn create(&self, task: &Task) -> Result<(), TaskError> {
        match self.tasks.entry(task.id) {
            Entry::Occupied(_) => Err(TaskError::AlreadyExists(task.id)),
            Entry::Vacant(slot) => {
                let mut stored = task.clone();
                stored.created_at = Utc::now();
                slot.insert(stored);
                Ok(())
            }
        }
    }

    fn get_by_id(&self, id: Uuid) -> Result<Task, TaskError> {
        self.tasks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(TaskError::NotFound(id))
    }

    fn update(&self, task: &Task) -> Result<(), TaskError> {
        match self.tasks.get_mut(&task.id) {
            Some(mut entry) => {
                *entry = task.clone();
                Ok(())
            }
            None => Err(TaskError::NotFound(task.id)),
        }
    }

    fn delete(&self, id: Uuid) -> Result<(), TaskError> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(TaskError::NotFound(id))
    }

    fn get_all(&self) -> Result<Vec<Task>, TaskError> {
        Ok(self.tasks.iter().map(|entry| entry.value().clone()).collect())
    }

    fn count(&self) -> usize {
        self.tasks.len()
    }
}
