//! # Gestor Central de Tareas
//! src/tasks/manager.rs
//!
//! Coordina el ciclo de vida de las tareas: creación, consulta, borrado,
//! listado, espera y shutdown. Une el store (estado persistido) con el
//! registry (estado vivo de cada ejecución).

use crate::tasks::context::{ContextRegistry, ExecutionContext};
use crate::tasks::error::TaskError;
use crate::tasks::executor::{TaskExecutor, WorkloadRange};
use crate::tasks::storage::{InMemoryTaskStore, TaskRepository};
use crate::tasks::types::{Task, TaskStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use uuid::Uuid;

/// Configuración del Task Manager
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Rango de duración del trabajo simulado
    pub workload: WorkloadRange,

    /// Tiempo máximo de ejecución de una tarea
    pub task_timeout: Duration,

    /// Intervalo entre ticks del executor
    pub poll_interval: Duration,

    /// Tiempo máximo de espera al drenar en el shutdown
    pub shutdown_timeout: Duration,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            workload: WorkloadRange::new(Duration::from_secs(180), Duration::from_secs(360)),
            task_timeout: Duration::from_secs(360),
            poll_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl TaskManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            workload: WorkloadRange::new(
                Duration::from_secs(config.workload_min_secs),
                Duration::from_secs(config.workload_max_secs),
            ),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

/// Estadísticas de tareas para `/metrics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
    pub active_executions: usize,
}

/// Gestor central de tareas
pub struct TaskManager {
    config: TaskManagerConfig,
    repo: Arc<dyn TaskRepository>,
    registry: Arc<ContextRegistry>,
    executor: TaskExecutor,
    tracker: TaskTracker,
}

impl TaskManager {
    /// Crea un Task Manager con el store en memoria
    pub fn new(config: TaskManagerConfig) -> Self {
        Self::with_repository(config, Arc::new(InMemoryTaskStore::new()))
    }

    /// Crea un Task Manager sobre un store arbitrario
    pub fn with_repository(config: TaskManagerConfig, repo: Arc<dyn TaskRepository>) -> Self {
        let registry = Arc::new(ContextRegistry::new());
        let executor = TaskExecutor::new(
            Arc::clone(&repo),
            Arc::clone(&registry),
            config.workload,
            config.poll_interval,
        );

        Self {
            config,
            repo,
            registry,
            executor,
            tracker: TaskTracker::new(),
        }
    }

    /// Crea una tarea y lanza su ejecución sin esperarla
    pub fn create_task(&self, name: &str) -> Result<Task, TaskError> {
        if self.tracker.is_closed() {
            return Err(TaskError::ShuttingDown);
        }

        let task = Task::new(name);
        self.repo.create(&task)?;
        // El store fija created_at; la respuesta debe reflejarlo
        let task = self.repo.get_by_id(task.id)?;

        let context = Arc::new(ExecutionContext::new(task.id, self.config.task_timeout));
        if let Err(error) = self.registry.register(Arc::clone(&context)) {
            if let Err(rollback) = self.repo.delete(task.id) {
                warn!(task_id = %task.id, error = %rollback, "failed to roll back task record");
            }
            return Err(error);
        }

        // Un shutdown que empezó entre el chequeo inicial y el registro
        // no alcanzó a ver este contexto
        if self.tracker.is_closed() {
            context.cancel();
        }

        info!(task_id = %task.id, name = %task.name, "task created");
        self.tracker
            .spawn(self.executor.clone().run(task.clone(), context));

        Ok(task)
    }

    /// Obtiene una tarea con su tiempo de procesamiento en vivo
    pub fn get_task(&self, id: Uuid) -> Result<Task, TaskError> {
        let mut task = self.repo.get_by_id(id)?;
        self.overlay_live_elapsed(&mut task);
        Ok(task)
    }

    /// Cancela la ejecución (si sigue viva) y elimina la tarea
    pub fn delete_task(&self, id: Uuid) -> Result<(), TaskError> {
        self.repo.get_by_id(id)?;

        if let Some(context) = self.registry.remove(id) {
            context.cancel();
        }

        self.repo.delete(id)?;
        info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Lista todas las tareas con el tiempo en vivo de las que siguen procesando
    pub fn list_tasks(&self) -> Result<Vec<Task>, TaskError> {
        let mut tasks = self.repo.get_all()?;
        for task in &mut tasks {
            self.overlay_live_elapsed(task);
        }
        Ok(tasks)
    }

    /// Lista las tareas con un estado dado
    ///
    /// El filtro se aplica después del overlay: una tarea que acaba de
    /// finalizar ya no aparece como `Processing`.
    pub fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, TaskError> {
        let mut tasks = self.repo.get_by_status(status)?;
        for task in &mut tasks {
            self.overlay_live_elapsed(task);
        }
        tasks.retain(|task| task.status == status);
        Ok(tasks)
    }

    /// Cancela una ejecución viva sin borrar la tarea
    ///
    /// La tarea queda en FAILED y sigue siendo consultable.
    pub fn cancel_task(&self, id: Uuid) -> Result<(), TaskError> {
        let context = self.registry.get(id).ok_or(TaskError::NotFound(id))?;
        context.cancel();
        info!(task_id = %id, "task cancellation requested");
        Ok(())
    }

    /// Espera a que la ejecución de una tarea termine
    ///
    /// Falla con `NotFound` si no hay contexto vivo (ya terminó o nunca
    /// existió) y con `Timeout` si vence el plazo. Soltar el future
    /// cancela la espera.
    pub async fn wait_for_task(&self, id: Uuid, timeout: Duration) -> Result<TaskStatus, TaskError> {
        let context = self.registry.get(id).ok_or(TaskError::NotFound(id))?;

        tokio::time::timeout(timeout, context.finished())
            .await
            .map_err(|_| TaskError::Timeout(timeout))?;

        Ok(context.status())
    }

    /// Último estado observado por el contexto vivo, sin consultar el store
    pub fn get_task_status(&self, id: Uuid) -> Option<TaskStatus> {
        self.registry.get(id).map(|context| context.status())
    }

    /// Cantidad de ejecuciones vivas
    pub fn active_executions(&self) -> usize {
        self.registry.len()
    }

    /// Conteo de tareas por estado
    pub fn stats(&self) -> TaskStats {
        let count = |status: TaskStatus| match self.repo.get_by_status(status) {
            Ok(tasks) => tasks.len(),
            Err(error) => {
                warn!(%status, error = %error, "failed to read tasks for stats");
                0
            }
        };

        TaskStats {
            total: self.repo.count(),
            processing: count(TaskStatus::Processing),
            done: count(TaskStatus::Done),
            failed: count(TaskStatus::Failed),
            active_executions: self.registry.len(),
        }
    }

    /// Cancela todas las ejecuciones y espera a que terminen
    ///
    /// Falla con `Timeout` si no se drenan antes del plazo.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), TaskError> {
        self.tracker.close();
        let cancelled = self.registry.cancel_all();
        info!(cancelled, "shutting down task manager");

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("all tasks finished, task manager shutdown complete");
                Ok(())
            }
            Err(_) => {
                warn!(remaining = self.tracker.len(), "shutdown timeout reached");
                Err(TaskError::Timeout(timeout))
            }
        }
    }

    /// Mientras el contexto siga registrado manda él: tiempo en vivo o,
    /// si ya finalizó, el estado y el tiempo congelados
    fn overlay_live_elapsed(&self, task: &mut Task) {
        if task.status.is_terminal() {
            return;
        }

        if let Some(context) = self.registry.get(task.id) {
            task.processing_time = context.processing_time();
            task.status = context.status();
        }
    }
}
