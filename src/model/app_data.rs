use serde::{Deserialize, Deserializer, Serialize};

use super::project::Project;
use super::task::TaskStatus;

/// Reserved filter tag meaning "tasks with no tags at all"
pub const NO_TAG: &str = "__no_tag__";

/// Task filters for the current project view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default = "all_statuses")]
    pub statuses: Vec<TaskStatus>,
    /// May contain [`NO_TAG`]
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            statuses: all_statuses(),
            tags: Vec::new(),
            search: String::new(),
            project_id: None,
        }
    }
}

fn all_statuses() -> Vec<TaskStatus> {
    TaskStatus::ALL.to_vec()
}

/// Project list status class, derived from project progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl ProjectStatusFilter {
    pub fn parse_filter(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ProjectStatusFilter::All),
            "active" => Some(ProjectStatusFilter::Active),
            "completed" => Some(ProjectStatusFilter::Completed),
            _ => None,
        }
    }
}

/// Filters for the project list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatusFilter,
}

/// Root aggregate: everything that is persisted and backed up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub filters: Filters,
    /// Empty string on the wire means no selection
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_project_id: Option<String>,
    #[serde(default)]
    pub project_filters: ProjectFilters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

impl AppData {
    /// The selected project, falling back to the first one when the
    /// stored id no longer resolves.
    pub fn current_project(&self) -> Option<&Project> {
        let idx = self.current_project_index()?;
        self.projects.get(idx)
    }

    pub fn current_project_mut(&mut self) -> Option<&mut Project> {
        let idx = self.current_project_index()?;
        self.projects.get_mut(idx)
    }

    fn current_project_index(&self) -> Option<usize> {
        if self.projects.is_empty() {
            return None;
        }
        let found = self
            .current_project_id
            .as_deref()
            .and_then(|id| self.projects.iter().position(|p| p.id == id));
        Some(found.unwrap_or(0))
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn project_mut(&mut self, project_id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == project_id)
    }
}
