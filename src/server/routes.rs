//! # Tabla de Rutas
//! src/server/routes.rs
//!
//! Registra los endpoints de la API y adapta cada handler al estado
//! compartido del servidor.

use crate::http::{Method, Request, Response, StatusCode};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::router::{PathParams, Router};
use crate::tasks::handlers::{self as task_handlers, API_PREFIX};
use crate::tasks::{TaskManager, TaskStats};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Estado compartido por todas las conexiones
pub struct AppState {
    pub manager: TaskManager,
    pub metrics: MetricsCollector,
    pub max_name_len: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    server: MetricsSnapshot,
    tasks: TaskStats,
}

fn create_task(req: &Request, _params: &PathParams, state: &AppState) -> Response {
    task_handlers::create_handler(req, &state.manager, state.max_name_len)
}

fn get_task(_req: &Request, params: &PathParams, state: &AppState) -> Response {
    task_handlers::get_handler(params.get("id"), &state.manager)
}

fn delete_task(_req: &Request, params: &PathParams, state: &AppState) -> Response {
    task_handlers::delete_handler(params.get("id"), &state.manager)
}

fn list_tasks(req: &Request, _params: &PathParams, state: &AppState) -> Response {
    task_handlers::list_handler(req, &state.manager)
}

fn health(_req: &Request, _params: &PathParams, _state: &AppState) -> Response {
    Response::json(
        StatusCode::Ok,
        &HealthResponse {
            status: "healthy",
            timestamp: Utc::now(),
        },
    )
}

fn metrics(_req: &Request, _params: &PathParams, state: &AppState) -> Response {
    Response::json(
        StatusCode::Ok,
        &MetricsResponse {
            server: state.metrics.get_snapshot(),
            tasks: state.manager.stats(),
        },
    )
}

/// Construye el router con todas las rutas de la API
pub fn build_router() -> Router<AppState> {
    let mut router = Router::new();

    router.register(Method::POST, &format!("{}/task/create", API_PREFIX), create_task);
    router.register(Method::GET, &format!("{}/task/{{id}}", API_PREFIX), get_task);
    router.register(Method::DELETE, &format!("{}/task/{{id}}", API_PREFIX), delete_task);
    router.register(Method::GET, &format!("{}/tasks", API_PREFIX), list_tasks);
    router.register(Method::GET, &format!("{}/health", API_PREFIX), health);
    router.register(Method::GET, "/metrics", metrics);

    router
}
