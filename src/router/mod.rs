//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea `(método, path)` a handlers.
//!
//! ```text
//! Request → Router → Handler(request, params, state) → Response
//! ```
//!
//! Los patrones aceptan segmentos literales y parámetros entre llaves:
//! `/api/v1/task/{id}`. Un path que coincide con algún patrón pero no
//! con el método responde 405; uno que no coincide con ninguno, 404.
//! Todas las respuestas llevan los headers comunes (CORS incluido).

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Nombre del servidor en el header `Server`
pub const SERVER_NAME: &str = concat!("task-server/", env!("CARGO_PKG_VERSION"));

/// Parámetros extraídos del path (`{id}` → valor)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }
}

/// Un handler recibe el request, los parámetros del path y el estado compartido
pub type Handler<S> = fn(&Request, &PathParams, &S) -> Response;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

struct Route<S> {
    method: Method,
    pattern: Vec<Segment>,
    handler: Handler<S>,
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/').split('/').collect()
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .into_iter()
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            }
        })
        .collect()
}

/// Intenta casar el path con un patrón; los parámetros no aceptan segmentos vacíos
fn match_pattern(pattern: &[Segment], path: &str) -> Option<PathParams> {
    let segments = split_path(path);
    if segments.len() != pattern.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(segments) {
        match expected {
            Segment::Literal(literal) if literal == actual => {}
            Segment::Param(name) if !actual.is_empty() => {
                params.insert(name.clone(), actual.to_string());
            }
            _ => return None,
        }
    }

    Some(PathParams(params))
}

/// Router que mapea rutas a handlers
pub struct Router<S> {
    routes: Vec<Route<S>>,
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta
    ///
    /// # Ejemplo
    /// ```
    /// use task_server::router::{PathParams, Router};
    /// use task_server::http::{Method, Request, Response, StatusCode};
    ///
    /// fn hello(_req: &Request, params: &PathParams, _state: &()) -> Response {
    ///     Response::new(StatusCode::Ok).with_body(params.get("name").unwrap_or("world"))
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello/{name}", hello);
    ///
    /// let request = Request::parse(b"GET /hello/rust HTTP/1.1\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request, &()).body(), b"rust");
    /// ```
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler<S>) {
        self.routes.push(Route {
            method,
            pattern: parse_pattern(pattern),
            handler,
        });
    }

    /// Despacha el request al handler correspondiente
    pub fn route(&self, request: &Request, state: &S) -> Response {
        let path = request.path();
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = match_pattern(&route.pattern, path) else {
                continue;
            };

            if route.method == request.method() {
                let mut response = (route.handler)(request, &params, state);
                add_common_headers(&mut response);
                return response;
            }
            allowed.push(route.method);
        }

        let mut response = if allowed.is_empty() {
            Response::error(
                StatusCode::NotFound,
                "route_not_found",
                &format!("Route not found: {}", path),
            )
        } else if request.method() == Method::OPTIONS {
            preflight(&allowed)
        } else {
            let allow = allow_header(&allowed);
            Response::error(
                StatusCode::MethodNotAllowed,
                "method_not_allowed",
                &format!("Method {} not allowed for {}", request.method(), path),
            )
            .with_header("Allow", &allow)
        };

        add_common_headers(&mut response);
        response
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn allow_header(allowed: &[Method]) -> String {
    allowed
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Respuesta a un preflight CORS
fn preflight(allowed: &[Method]) -> Response {
    let mut methods = allowed.to_vec();
    methods.push(Method::OPTIONS);

    Response::new(StatusCode::NoContent)
        .with_header("Access-Control-Allow-Methods", &allow_header(&methods))
        .with_header("Access-Control-Allow-Headers", "Content-Type")
        .with_header("Allow", &allow_header(&methods))
}

/// Headers presentes en todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
    response.add_header("Access-Control-Allow-Origin", "*");
}
