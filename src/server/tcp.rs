//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Acepta conexiones con tokio y atiende cada una en su propia tarea.
//! Cada conexión lleva un único request; la respuesta sale con
//! `Connection: close`.
//!
//! Al recibir la señal de apagado deja de aceptar conexiones, cancela
//! todas las tareas en ejecución y espera (acotado) a que terminen.

use crate::config::Config;
use crate::http::{head_len, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::{add_common_headers, Router};
use crate::server::routes::{build_router, AppState};
use crate::tasks::{TaskManager, TaskManagerConfig};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tamaño máximo aceptado para un request completo
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Tiempo máximo para recibir el request
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Servidor HTTP de tareas
pub struct Server {
    config: Config,
    state: Arc<AppState>,
    router: Arc<Router<AppState>>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let manager = TaskManager::new(TaskManagerConfig::from_config(&config));
        let state = AppState {
            manager,
            metrics: MetricsCollector::new(),
            max_name_len: config.max_name_len,
        };

        Self {
            config,
            state: Arc::new(state),
            router: Arc::new(build_router()),
        }
    }

    /// Estado compartido (manager y métricas)
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Hace bind en la dirección configurada y sirve hasta SIGINT/SIGTERM
    pub async fn run(self) -> io::Result<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Sirve sobre un listener ya creado hasta que `shutdown` se resuelva
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "server listening");

        let connections = TaskTracker::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let router = Arc::clone(&self.router);
                        let state = Arc::clone(&self.state);
                        state.metrics.increment_active_connections();

                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, &router, &state).await {
                                warn!(peer = %peer, error = %e, "connection error");
                            }
                            state.metrics.decrement_active_connections();
                        });
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },
            }
        }

        info!("shutdown signal received, stopping listener");
        drop(listener);

        let drain = Duration::from_secs(self.config.shutdown_timeout_secs);
        if let Err(e) = self.state.manager.shutdown(drain).await {
            warn!(error = %e, "task manager did not drain in time");
        }

        connections.close();
        if tokio::time::timeout(drain, connections.wait()).await.is_err() {
            warn!(open = connections.len(), "connections still open after shutdown");
        }

        info!("server stopped");
        Ok(())
    }
}

/// Resuelve al recibir SIGINT o SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Lee hasta tener headers completos más `Content-Length` bytes de body
async fn read_request(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(end) = head_len(&buffer) {
            let expected = Request::parse(&buffer[..end])
                .ok()
                .and_then(|request| request.content_length())
                .unwrap_or(0);
            if buffer.len() >= end + expected {
                break;
            }
        }

        if buffer.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }

    Ok(buffer)
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: &Router<AppState>,
    state: &AppState,
) -> io::Result<()> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().simple().to_string();

    let buffer = match tokio::time::timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "request read timed out"));
        }
    };

    if buffer.is_empty() {
        debug!(peer = %peer, "connection closed before request");
        return Ok(());
    }

    let (mut response, method, path) = match Request::parse(&buffer) {
        Ok(request) => {
            debug!(
                request_id = %request_id,
                method = %request.method(),
                path = request.path(),
                version = request.version(),
                "request received"
            );
            (
                router.route(&request, state),
                request.method().as_str(),
                request.path().to_string(),
            )
        }
        Err(e) => {
            warn!(request_id = %request_id, peer = %peer, error = %e, "malformed request");
            let mut response = Response::error(
                StatusCode::BadRequest,
                "bad_request",
                &format!("Invalid request: {}", e),
            );
            add_common_headers(&mut response);
            (response, "-", "/error".to_string())
        }
    };

    response.add_header("X-Request-Id", &request_id);
    response.add_header("X-Worker-Pid", &std::process::id().to_string());

    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    let _ = stream.shutdown().await;

    let latency = start.elapsed();
    let status = response.status();
    state.metrics.record_request(&path, status.as_u16(), latency);

    let latency_ms = latency.as_secs_f64() * 1000.0;
    if status.is_server_error() {
        warn!(request_id = %request_id, method, path = %path, status = status.as_u16(), latency_ms, "request failed");
    } else {
        info!(request_id = %request_id, method, path = %path, status = status.as_u16(), latency_ms, "request served");
    }

    Ok(())
}
