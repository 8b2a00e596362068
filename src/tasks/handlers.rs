//! # Handlers HTTP para Tareas
//! src/tasks/handlers.rs
//!
//! Implementa los endpoints de tareas:
//! - `POST   /api/v1/task/create`
//! - `GET    /api/v1/task/{id}`
//! - `DELETE /api/v1/task/{id}`
//! - `GET    /api/v1/tasks` (acepta `?status=PROCESSING|DONE|FAILED`)

use crate::http::{Request, Response, StatusCode};
use crate::tasks::error::TaskError;
use crate::tasks::manager::TaskManager;
use crate::tasks::types::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

/// Prefijo de la API
pub const API_PREFIX: &str = "/api/v1";

/// Body de `POST /task/create`
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
}

/// Representación de una tarea en la API
///
/// `processing_time` va en nanosegundos enteros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub name: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub processing_time: u64,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            status: task.status,
            created_at: task.created_at,
            processing_time: u64::try_from(task.processing_time.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

/// Path de una tarea, usado en el header `Location`
pub fn task_location(id: Uuid) -> String {
    format!("{}/task/{}", API_PREFIX, id)
}

/// Valida el body de creación y retorna el nombre
fn validate_create(body: &[u8], max_name_len: usize) -> Result<String, String> {
    let request: CreateTaskRequest =
        serde_json::from_slice(body).map_err(|e| format!("invalid request body: {}", e))?;

    let len = request.name.chars().count();
    if len == 0 || len > max_name_len {
        return Err(format!(
            "name must be between 1 and {} characters",
            max_name_len
        ));
    }

    Ok(request.name)
}

/// Parsea el `{id}` del path
fn parse_task_id(raw: Option<&str>) -> Result<Uuid, Response> {
    let raw = raw.ok_or_else(|| {
        Response::error(StatusCode::BadRequest, "validation_error", "Missing task id")
    })?;

    Uuid::parse_str(raw).map_err(|_| {
        Response::error(StatusCode::BadRequest, "invalid_id", "Invalid task ID format")
    })
}

/// Traduce un error del manager a una respuesta
fn error_response(err: &TaskError, context: &str) -> Response {
    match err {
        TaskError::NotFound(_) => {
            Response::error(StatusCode::NotFound, "task_not_found", "Task not found")
        }
        TaskError::ShuttingDown => Response::error(
            StatusCode::ServiceUnavailable,
            "service_unavailable",
            "Server is shutting down",
        ),
        other => {
            error!(error = %other, "{}", context);
            Response::error(StatusCode::InternalServerError, "internal_error", context)
        }
    }
}

/// Handler para `POST /api/v1/task/create`
///
/// Body: `{"name": "..."}`. Responde 202 con la tarea y `Location`.
pub fn create_handler(req: &Request, manager: &TaskManager, max_name_len: usize) -> Response {
    let name = match validate_create(req.body(), max_name_len) {
        Ok(name) => name,
        Err(message) => {
            return Response::error(StatusCode::BadRequest, "validation_error", &message)
        }
    };

    match manager.create_task(&name) {
        Ok(task) => Response::json(StatusCode::Accepted, &TaskResponse::from(&task))
            .with_header("Location", &task_location(task.id)),
        Err(e) => error_response(&e, "Failed to create task"),
    }
}

/// Handler para `GET /api/v1/task/{id}`
pub fn get_handler(id: Option<&str>, manager: &TaskManager) -> Response {
    let id = match parse_task_id(id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.get_task(id) {
        Ok(task) => Response::json(StatusCode::Ok, &TaskResponse::from(&task)),
        Err(e) => error_response(&e, "Failed to get task"),
    }
}

/// Handler para `DELETE /api/v1/task/{id}`
pub fn delete_handler(id: Option<&str>, manager: &TaskManager) -> Response {
    let id = match parse_task_id(id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match manager.delete_task(id) {
        Ok(()) => Response::new(StatusCode::NoContent),
        Err(e) => error_response(&e, "Failed to delete task"),
    }
}

/// Handler para `GET /api/v1/tasks`
///
/// Con `?status=...` solo lista las tareas en ese estado.
pub fn list_handler(req: &Request, manager: &TaskManager) -> Response {
    let listed = match req.query_param("status") {
        None => manager.list_tasks(),
        Some(raw) => match TaskStatus::parse(raw) {
            Some(status) => manager.list_tasks_by_status(status),
            None => {
                return Response::error(
                    StatusCode::BadRequest,
                    "validation_error",
                    &format!("unknown status filter: {}", raw),
                )
            }
        },
    };

    match listed {
        Ok(tasks) => Response::json(
            StatusCode::Ok,
            &TaskListResponse {
                tasks: tasks.iter().map(TaskResponse::from).collect(),
            },
        ),
        Err(e) => error_response(&e, "Failed to retrieve tasks"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorBody;
    use crate::tasks::executor::WorkloadRange;
    use crate::tasks::manager::TaskManagerConfig;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn manager() -> TaskManager {
        TaskManager::new(TaskManagerConfig {
            workload: WorkloadRange::fixed(Duration::from_secs(60)),
            ..TaskManagerConfig::default()
        })
    }

    fn post(body: &str) -> Request {
        let raw = format!(
            "POST /api/v1/task/create HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn error_code(response: &Response) -> String {
        serde_json::from_slice::<ErrorBody>(response.body()).unwrap().error
    }

    // ==================== Create ====================

    #[tokio::test(start_paused = true)]
    async fn test_create_returns_accepted_with_location() {
        let manager = manager();

        let response = create_handler(&post(r#"{"name":"Alpha"}"#), &manager, 100);

        assert_eq!(response.status(), StatusCode::Accepted);
        let task: TaskResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(task.name, "Alpha");
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(response.header("Location"), Some(task_location(task.id).as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_validation_errors() {
        let manager = manager();
        let long = format!(r#"{{"name":"{}"}}"#, "x".repeat(101));

        for body in ["", "not json", "{}", r#"{"name":""}"#, r#"{"name":42}"#, long.as_str()] {
            let response = create_handler(&post(body), &manager, 100);
            assert_eq!(response.status(), StatusCode::BadRequest, "body: {}", body);
            assert_eq!(error_code(&response), "validation_error");
        }

        assert!(manager.list_tasks().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_name_length_counts_chars() {
        let manager = manager();
        let body = format!(r#"{{"name":"{}"}}"#, "ñ".repeat(100));

        let response = create_handler(&post(&body), &manager, 100);

        assert_eq!(response.status(), StatusCode::Accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_after_shutdown_is_unavailable() {
        let manager = manager();
        manager.shutdown(Duration::from_secs(1)).await.unwrap();

        let response = create_handler(&post(r#"{"name":"late"}"#), &manager, 100);

        assert_eq!(response.status(), StatusCode::ServiceUnavailable);
        assert_eq!(error_code(&response), "service_unavailable");
    }

    // ==================== Get / Delete ====================

    #[tokio::test(start_paused = true)]
    async fn test_get_existing_task() {
        let manager = manager();
        let task = manager.create_task("Beta").unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let id = task.id.to_string();
        let response = get_handler(Some(&id), &manager);

        assert_eq!(response.status(), StatusCode::Ok);
        let body: TaskResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.id, task.id);
        assert_eq!(body.processing_time, 1_500_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_invalid_and_missing() {
        let manager = manager();

        let response = get_handler(Some("not-a-uuid"), &manager);
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(error_code(&response), "invalid_id");

        let id = Uuid::new_v4().to_string();
        let response = get_handler(Some(&id), &manager);
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(error_code(&response), "task_not_found");

        let response = get_handler(None, &manager);
        assert_eq!(error_code(&response), "validation_error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_then_get() {
        let manager = manager();
        let id = manager.create_task("Gamma").unwrap().id.to_string();

        let response = delete_handler(Some(&id), &manager);
        assert_eq!(response.status(), StatusCode::NoContent);
        assert!(response.body().is_empty());

        assert_eq!(get_handler(Some(&id), &manager).status(), StatusCode::NotFound);
        assert_eq!(delete_handler(Some(&id), &manager).status(), StatusCode::NotFound);
        assert_eq!(delete_handler(Some("zzz"), &manager).status(), StatusCode::BadRequest);
    }

    // ==================== List ====================

    fn list_request(query: &str) -> Request {
        Request::parse(format!("GET /api/v1/tasks{} HTTP/1.1\r\n\r\n", query).as_bytes()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_wraps_tasks() {
        let manager = manager();
        let response = list_handler(&list_request(""), &manager);
        assert_eq!(response.body(), br#"{"tasks":[]}"#);

        manager.create_task("a").unwrap();
        manager.create_task("b").unwrap();

        let body: TaskListResponse =
            serde_json::from_slice(list_handler(&list_request(""), &manager).body()).unwrap();
        let mut names: Vec<_> = body.tasks.into_iter().map(|t| t.name).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_status_filter() {
        let manager = manager();
        let kept = manager.create_task("kept").unwrap();
        let cancelled = manager.create_task("cancelled").unwrap();
        manager.cancel_task(cancelled.id).unwrap();
        manager.wait_for_task(cancelled.id, Duration::from_secs(5)).await.unwrap();
        tokio::task::yield_now().await;

        let response = list_handler(&list_request("?status=processing"), &manager);
        assert_eq!(response.status(), StatusCode::Ok);
        let body: TaskListResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.tasks.len(), 1);
        assert_eq!(body.tasks[0].id, kept.id);

        let body: TaskListResponse =
            serde_json::from_slice(list_handler(&list_request("?status=FAILED"), &manager).body()).unwrap();
        assert_eq!(body.tasks.len(), 1);
        assert_eq!(body.tasks[0].id, cancelled.id);

        let response = list_handler(&list_request("?status=sleeping"), &manager);
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(error_code(&response), "validation_error");
    }

    // ==================== Formato ====================

    #[test]
    fn test_task_response_wire_format() {
        let mut task = Task::new("wire");
        task.processing_time = Duration::from_millis(2);

        let json = serde_json::to_value(TaskResponse::from(&task)).unwrap();

        assert_eq!(json["status"], "PROCESSING");
        assert_eq!(json["processing_time"], 2_000_000);
        assert_eq!(json["id"], task.id.to_string());
        assert!(json["created_at"].as_str().unwrap().contains('T'));
    }
}
