use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Settings applied to every state container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Label attached to log lines emitted by the container.
    #[serde(default = "default_container_name")]
    pub name: String,
    /// Warn when this many inputs are queued and not yet processed (default: 64).
    #[serde(default = "default_queue_warn_threshold")]
    pub queue_warn_threshold: usize,
    /// Log every published state at trace level (default: false).
    #[serde(default)]
    pub trace_states: bool,
}

impl ContainerConfig {
    /// Same settings under a different log label.
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Include the event target in log lines (default: true).
    #[serde(default = "default_true")]
    pub with_target: bool,
}

/// Parameters for the in-memory feed driven by the demo binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of concatenated sources (default: 2).
    #[serde(default = "default_sources")]
    pub sources: usize,
    /// Pages served by each source before it runs dry (default: 3).
    #[serde(default = "default_pages")]
    pub pages_per_source: usize,
    /// Items per page (default: 5).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Simulated fetch latency in milliseconds (default: 50).
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Make the first fetch of this page number fail (1-based, first source only).
    #[serde(default)]
    pub fail_page: Option<usize>,
}

fn default_container_name() -> String {
    "container".to_string()
}

fn default_queue_warn_threshold() -> usize {
    64
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sources() -> usize {
    2
}

fn default_pages() -> usize {
    3
}

fn default_page_size() -> usize {
    5
}

fn default_latency_ms() -> u64 {
    50
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: default_container_name(),
            queue_warn_threshold: default_queue_warn_threshold(),
            trace_states: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            with_target: default_true(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            pages_per_source: default_pages(),
            page_size: default_page_size(),
            latency_ms: default_latency_ms(),
            fail_page: None,
        }
    }
}
