//! # Executor de Tareas
//! src/tasks/executor.rs
//!
//! Ejecuta el trabajo simulado de una tarea:
//!
//! ```text
//! inicio ──tick──tick──tick── elapsed >= workload ──> DONE
//!    │                │
//!    │                └── fallo al persistir ──────> FAILED
//!    └── cancelación o deadline global ────────────> FAILED
//! ```
//!
//! Cada tick persiste el tiempo transcurrido. La finalización marca el
//! contexto como terminado (congelando el tiempo), hace una escritura
//! best-effort con ese valor y lo remueve del registry.

use crate::tasks::context::{ContextRegistry, ExecutionContext};
use crate::tasks::error::TaskError;
use crate::tasks::storage::TaskRepository;
use crate::tasks::types::{Task, TaskStatus};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Rango de duración del trabajo simulado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadRange {
    pub min: Duration,
    pub max: Duration,
}

impl WorkloadRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Duración fija
    #[cfg(test)]
    pub fn fixed(duration: Duration) -> Self {
        Self::new(duration, duration)
    }

    /// Elige una duración uniforme dentro del rango
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Motivo por el que una ejecución no llegó a DONE
#[derive(Debug)]
struct ExecutionFailure {
    error: TaskError,
    elapsed: Duration,
}

/// Ejecuta tareas individuales
#[derive(Clone)]
pub struct TaskExecutor {
    repo: Arc<dyn TaskRepository>,
    registry: Arc<ContextRegistry>,
    workload: WorkloadRange,
    poll_interval: Duration,
}

impl TaskExecutor {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        registry: Arc<ContextRegistry>,
        workload: WorkloadRange,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            registry,
            workload,
            poll_interval,
        }
    }

    /// Corre la tarea hasta DONE o FAILED
    ///
    /// `task` es la copia de trabajo del executor; el store solo ve
    /// lo que se persiste en cada tick y en la finalización.
    pub async fn run(self, mut task: Task, context: Arc<ExecutionContext>) {
        let _guard = FinalizeGuard {
            context: Arc::clone(&context),
            registry: Arc::clone(&self.registry),
        };

        let workload = self.workload.sample();
        info!(
            task_id = %task.id,
            name = %task.name,
            workload_ms = workload.as_millis() as u64,
            "starting task execution"
        );

        match self.drive(&mut task, &context, workload).await {
            Ok(elapsed) => {
                info!(task_id = %task.id, elapsed_ms = elapsed.as_millis() as u64, "task completed");
                self.finalize(&mut task, &context, TaskStatus::Done, elapsed);
            }
            Err(failure) => {
                warn!(
                    task_id = %task.id,
                    elapsed_ms = failure.elapsed.as_millis() as u64,
                    error = %failure.error,
                    "task failed"
                );
                self.finalize(&mut task, &context, TaskStatus::Failed, failure.elapsed);
            }
        }
    }

    /// Loop de polling: tick, cancelación y deadline compiten en cada vuelta
    async fn drive(
        &self,
        task: &mut Task,
        context: &ExecutionContext,
        workload: Duration,
    ) -> Result<Duration, ExecutionFailure> {
        let first_tick = context
            .started()
            .checked_add(self.poll_interval)
            .unwrap_or_else(|| context.deadline());
        let mut ticker = tokio::time::interval_at(first_tick, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = tokio::time::sleep_until(context.deadline());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = context.cancellation().cancelled() => {
                    return Err(ExecutionFailure {
                        error: TaskError::Cancelled(task.id),
                        elapsed: context.elapsed(),
                    });
                }

                _ = ticker.tick() => {
                    let elapsed = context.elapsed();
                    if elapsed >= workload {
                        return Ok(elapsed);
                    }

                    task.processing_time = elapsed;
                    if let Err(error) = self.repo.update(task) {
                        return Err(ExecutionFailure { error, elapsed });
                    }
                    debug!(task_id = %task.id, elapsed_ms = elapsed.as_millis() as u64, "progress persisted");
                }

                _ = &mut deadline => {
                    return Err(ExecutionFailure {
                        error: TaskError::Timeout(context.deadline() - context.started()),
                        elapsed: context.elapsed(),
                    });
                }
            }
        }
    }

    fn finalize(
        &self,
        task: &mut Task,
        context: &ExecutionContext,
        status: TaskStatus,
        elapsed: Duration,
    ) {
        if !context.mark_finished(status) {
            debug!(task_id = %task.id, "task was already finalized");
        }

        // El store recibe lo que quedó congelado en el contexto
        task.status = context.status();
        task.processing_time = context.processing_time();
        debug!(
            task_id = %task.id,
            observed_ms = elapsed.as_millis() as u64,
            frozen_ms = task.processing_time.as_millis() as u64,
            "context finalized"
        );

        match self.repo.update(task) {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                debug!(task_id = %task.id, "task deleted before final write");
            }
            Err(error) => {
                warn!(task_id = %task.id, error = %error, "failed to persist final task state");
            }
        }
    }
}

/// Garantiza que el contexto termine y salga del registry en cualquier salida
struct FinalizeGuard {
    context: Arc<ExecutionContext>,
    registry: Arc<ContextRegistry>,
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if self.context.mark_finished(TaskStatus::Failed) {
            warn!(task_id = %self.context.id(), "execution ended without finalization, forcing FAILED");
        }
        self.registry.release(&self.context);
        info!(
            task_id = %self.context.id(),
            status = %self.context.status(),
            "task execution finished"
        );
    }
}
