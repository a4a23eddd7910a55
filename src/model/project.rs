use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A project: a named forest of tasks plus its tag vocabularies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Hex color like `#3B82F6`
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Root-level tasks in display order
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Tags offered when tagging tasks in this project
    #[serde(default)]
    pub available_tags: Vec<String>,
    /// Tags classifying the project itself
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Project {
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
