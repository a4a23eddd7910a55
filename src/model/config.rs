use serde::{Deserialize, Serialize};

/// Configuration from config.toml in the data directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub projects: ProjectDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Quiet period before a pending write is flushed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log directory; `<data dir>/logs` when absent
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDefaults {
    /// Tag vocabulary seeded into every new project
    #[serde(default = "default_tags")]
    pub default_tags: Vec<String>,
    /// Colors picked at random for new projects
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        ProjectDefaults {
            default_tags: default_tags(),
            palette: default_palette(),
        }
    }
}

fn default_tags() -> Vec<String> {
    ["Important", "Work", "Personal", "Urgent", "Idea"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_palette() -> Vec<String> {
    [
        "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
        "#F97316", "#6366F1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
