//! # Contextos de Ejecución
//! src/tasks/context.rs
//!
//! Cada tarea en ejecución tiene un `ExecutionContext` con:
//! - un token de cancelación (borrado, shutdown o cancelación explícita)
//! - el instante de inicio y el deadline global
//! - una señal de finalización que se dispara una sola vez
//! - el último estado observado y el tiempo congelado al finalizar,
//!   protegidos por su propio lock
//!
//! El `ContextRegistry` indexa los contextos vivos por ID de tarea.

use crate::tasks::error::TaskError;
use crate::tasks::types::TaskStatus;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Horizonte usado cuando `inicio + timeout` no es representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Estado final de una ejecución
#[derive(Debug, Clone, Copy)]
struct Outcome {
    status: TaskStatus,
    /// `Some` desde que el contexto se marca como terminado
    elapsed: Option<Duration>,
}

/// Handle de control de una tarea en ejecución
#[derive(Debug)]
pub struct ExecutionContext {
    id: Uuid,
    cancel: CancellationToken,
    started: Instant,
    deadline: Instant,
    done: CancellationToken,
    outcome: RwLock<Outcome>,
}

impl ExecutionContext {
    /// Crea un contexto que expira `timeout` después de ahora
    ///
    /// Un timeout que desborda el reloj se satura a un deadline lejano.
    pub fn new(id: Uuid, timeout: Duration) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);

        Self {
            id,
            cancel: CancellationToken::new(),
            started,
            deadline,
            done: CancellationToken::new(),
            outcome: RwLock::new(Outcome {
                status: TaskStatus::Processing,
                elapsed: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Tiempo transcurrido desde el inicio
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Solicita la cancelación de la ejecución
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token que observa el executor
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// No bloquea: indica si la señal de finalización ya se disparó
    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Último estado observado
    pub fn status(&self) -> TaskStatus {
        self.outcome.read().status
    }

    /// Tiempo de procesamiento visible
    ///
    /// En vivo mientras corre; congelado desde `mark_finished`. El valor
    /// vivo se toma bajo el mismo lock, así que nunca supera al congelado.
    pub fn processing_time(&self) -> Duration {
        let outcome = self.outcome.read();
        outcome.elapsed.unwrap_or_else(|| self.elapsed())
    }

    /// Registra el estado final, congela el tiempo transcurrido y dispara
    /// la señal de finalización
    ///
    /// Solo el primer llamador gana. Retorna `true` si esta llamada fue
    /// la que finalizó el contexto; las siguientes no modifican nada.
    pub fn mark_finished(&self, status: TaskStatus) -> bool {
        let mut outcome = self.outcome.write();
        if self.done.is_cancelled() {
            return false;
        }
        outcome.status = status;
        outcome.elapsed = Some(self.elapsed());
        self.done.cancel();
        true
    }

    /// Espera a que la señal de finalización se dispare
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }
}

/// Índice de contextos vivos por ID de tarea
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: DashMap<Uuid, Arc<ExecutionContext>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un contexto nuevo
    ///
    /// Falla si ya hay uno vivo para ese ID: hay que removerlo antes.
    pub fn register(&self, context: Arc<ExecutionContext>) -> Result<(), TaskError> {
        match self.contexts.entry(context.id()) {
            Entry::Occupied(_) => Err(TaskError::AlreadyExists(context.id())),
            Entry::Vacant(slot) => {
                slot.insert(context);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<ExecutionContext>> {
        self.contexts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remueve el contexto; no falla si no existe
    pub fn remove(&self, id: Uuid) -> Option<Arc<ExecutionContext>> {
        self.contexts.remove(&id).map(|(_, context)| context)
    }

    /// Remueve el contexto solo si el registrado es exactamente este
    pub fn release(&self, context: &Arc<ExecutionContext>) -> bool {
        self.contexts
            .remove_if(&context.id(), |_, registered| Arc::ptr_eq(registered, context))
            .is_some()
    }

    /// Copia de los contextos vivos
    pub fn snapshot(&self) -> Vec<Arc<ExecutionContext>> {
        self.contexts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Cancela todos los contextos que aún no terminaron
    ///
    /// Retorna cuántos se cancelaron.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for context in self.snapshot() {
            if !context.is_finished() {
                context.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
