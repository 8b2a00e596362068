//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de tareas con soporte para argumentos CLI
//! y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./task_server --port 8080 \
//!   --workload-min-secs 180 \
//!   --workload-max-secs 360 \
//!   --task-timeout-secs 360
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 RUST_LOG=task_server=debug ./task_server
//! ```

use clap::Parser;
use thiserror::Error;

/// Errores de validación de la configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be > 0")]
    Zero(&'static str),

    #[error("{field} must be <= {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("workload min ({min}s) must be <= workload max ({max}s)")]
    WorkloadRange { min: u64, max: u64 },

    #[error("invalid log level: {0}")]
    LogLevel(String),
}

/// Configuración del servidor de tareas
#[derive(Debug, Clone, Parser)]
#[command(name = "task_server")]
#[command(about = "Servicio REST de tareas asíncronas con coordinador de ciclo de vida")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Trabajo simulado ===

    /// Duración mínima del trabajo de una tarea (segundos)
    #[arg(long = "workload-min-secs", default_value = "180", env = "WORKLOAD_MIN_SECS")]
    pub workload_min_secs: u64,

    /// Duración máxima del trabajo de una tarea (segundos)
    #[arg(long = "workload-max-secs", default_value = "360", env = "WORKLOAD_MAX_SECS")]
    pub workload_max_secs: u64,

    // === Timeouts ===

    /// Tiempo máximo de ejecución de una tarea (segundos)
    #[arg(long = "task-timeout-secs", default_value = "360", env = "TASK_TIMEOUT_SECS")]
    pub task_timeout_secs: u64,

    /// Intervalo de polling del executor (milisegundos)
    #[arg(long = "poll-interval-ms", default_value = "1000", env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Tiempo máximo para drenar tareas al apagar (segundos)
    #[arg(long = "shutdown-timeout-secs", default_value = "30", env = "SHUTDOWN_TIMEOUT_SECS")]
    pub shutdown_timeout_secs: u64,

    // === API ===

    /// Largo máximo del nombre de una tarea (caracteres)
    #[arg(long = "max-name-len", default_value = "100", env = "MAX_NAME_LEN")]
    pub max_name_len: usize,

    /// Nivel de log cuando RUST_LOG no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Límite del timeout por tarea (una semana)
pub const MAX_TASK_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Límite del intervalo de polling (una hora)
pub const MAX_POLL_INTERVAL_MS: u64 = 3600 * 1000;

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección para bind (host:port)
    ///
    /// ```rust
    /// use task_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workload_min_secs == 0 {
            return Err(ConfigError::Zero("workload min"));
        }
        if self.workload_max_secs == 0 {
            return Err(ConfigError::Zero("workload max"));
        }
        if self.workload_min_secs > self.workload_max_secs {
            return Err(ConfigError::WorkloadRange {
                min: self.workload_min_secs,
                max: self.workload_max_secs,
            });
        }

        if self.task_timeout_secs == 0 {
            return Err(ConfigError::Zero("task timeout"));
        }
        if self.task_timeout_secs > MAX_TASK_TIMEOUT_SECS {
            return Err(ConfigError::TooLarge {
                field: "task timeout",
                max: MAX_TASK_TIMEOUT_SECS,
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll interval"));
        }
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::TooLarge {
                field: "poll interval",
                max: MAX_POLL_INTERVAL_MS,
            });
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Zero("shutdown timeout"));
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Zero("max name length"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::LogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║               Task Server Configuration                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!();
        println!("⚙️  Tasks:");
        println!(
            "   Workload:     {}s - {}s",
            self.workload_min_secs, self.workload_max_secs
        );
        println!("   Timeout:      {}s", self.task_timeout_secs);
        println!("   Poll:         {} ms", self.poll_interval_ms);
        println!("   Max name:     {} chars", self.max_name_len);
        println!();
        println!("🛑 Shutdown:");
        println!("   Drain limit:  {}s", self.shutdown_timeout_secs);
        println!();
        println!("📝 Log level:    {}", self.log_level);
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workload_min_secs: 180,
            workload_max_secs: 360,
            task_timeout_secs: 360,
            poll_interval_ms: 1000,
            shutdown_timeout_secs: 30,
            max_name_len: 100,
            log_level: "info".to_string(),
        }
    }
}
