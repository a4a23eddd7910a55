use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task progress state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::InProgress => '>',
            TaskStatus::Done => 'x',
        }
    }

    /// Wire name, as stored in snapshots
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    /// Parse a wire name (also accepts `active` for in-progress)
    pub fn parse_status(s: &str) -> Option<TaskStatus> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in-progress" | "active" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// Todo and in-progress both count as open work
    pub fn is_active(self) -> bool {
        self != TaskStatus::Done
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in a project's task forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique id, never reassigned
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// Tag set; order carries no meaning
    #[serde(default)]
    pub tags: Vec<String>,
    /// Children in display order
    #[serde(default)]
    pub subtasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning project (lookup only)
    #[serde(default)]
    pub project_id: String,
}

impl Task {
    /// Create a fresh `todo` task stamped with the current time
    pub fn new(id: String, title: String, tags: Vec<String>, project_id: String) -> Self {
        let now = Utc::now();
        Task {
            id,
            title,
            status: TaskStatus::Todo,
            tags,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
            project_id,
        }
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
