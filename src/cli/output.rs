use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::project::Project;
use crate::model::task::{Task, TaskStatus};
use crate::ops::project_ops;
use crate::ops::task_ops::{self, SubtaskStats};
use crate::util::unicode::{display_width, pad_to_width};

const NAME_COLUMN: usize = 24;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ProgressJson {
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectJson {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub tags: Vec<String>,
    pub task_count: usize,
    pub progress: u32,
    pub current: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCountJson {
    pub tag: String,
    pub count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsJson {
    pub available: Vec<String>,
    pub used: Vec<TagCountJson>,
    pub untagged: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson {
    let progress = task.has_subtasks().then(|| {
        let stats = SubtaskStats::of(task);
        ProgressJson {
            total: stats.total,
            completed: stats.completed,
            percent: stats.progress(),
        }
    });
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        status: task.status,
        tags: task.tags.clone(),
        created_at: task.created_at,
        updated_at: task.updated_at,
        progress,
        subtasks: task.subtasks.iter().map(task_to_json).collect(),
    }
}

pub fn project_to_json(project: &Project, current: bool) -> ProjectJson {
    ProjectJson {
        id: project.id.clone(),
        name: project.name.clone(),
        description: project.description.clone(),
        color: project.color.clone(),
        tags: project.tags.clone(),
        task_count: project_ops::project_task_count(project),
        progress: project_ops::project_progress(project),
        current,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Shortest id prefix shown in listings
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn tags_suffix(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            tags.iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

/// One-line task summary: `[x] 1a2b3c4d Title #tag (2/3)`
pub fn format_task_line(task: &Task) -> String {
    let counts = if task.has_subtasks() {
        let stats = SubtaskStats::of(task);
        format!(" ({}/{})", stats.completed, stats.total)
    } else {
        String::new()
    };
    format!(
        "[{}] {} {}{}{}",
        task.status.checkbox_char(),
        short_id(&task.id),
        task.title,
        tags_suffix(&task.tags),
        counts
    )
}

/// Format a task with its subtasks, indented
pub fn format_task_tree(task: &Task, indent: usize) -> Vec<String> {
    let mut lines = vec![format!("{}{}", "  ".repeat(indent), format_task_line(task))];
    for sub in &task.subtasks {
        lines.extend(format_task_tree(sub, indent + 1));
    }
    lines
}

/// Full listing of a forest under a project header
pub fn format_task_listing(project: &Project, tasks: &[Task]) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", project.name)];
    if tasks.is_empty() {
        lines.push("(no tasks)".to_string());
    }
    for task in tasks {
        lines.extend(format_task_tree(task, 0));
    }
    lines
}

/// Detailed task view
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] {}",
        task.status.checkbox_char(),
        task.title
    )];
    lines.push(format!("id: {}", task.id));
    lines.push(format!("status: {}", task.status));
    if !task.tags.is_empty() {
        lines.push(format!("tags:{}", tags_suffix(&task.tags)));
    }
    lines.push(format!("created: {}", task.created_at.format("%Y-%m-%d %H:%M")));
    lines.push(format!("updated: {}", task.updated_at.format("%Y-%m-%d %H:%M")));

    if task.has_subtasks() {
        let stats = SubtaskStats::of(task);
        lines.push(format!(
            "progress: {}/{} ({:.0}%)",
            stats.completed,
            stats.total,
            stats.progress()
        ));
        if task_ops::status_locked(task) {
            lines.push("status follows open subtasks".to_string());
        }
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for sub in &task.subtasks {
            lines.extend(format_task_tree(sub, 1));
        }
    }
    lines
}

/// One row of `project list`
pub fn format_project_row(project: &Project, current: bool) -> String {
    let marker = if current { '*' } else { ' ' };
    format!(
        "{} {} {} {:>3}% {:>3} tasks{}",
        marker,
        short_id(&project.id),
        pad_to_width(&project.name, NAME_COLUMN),
        project_ops::project_progress(project),
        project_ops::project_task_count(project),
        tags_suffix(&project.tags)
    )
}

/// Tag usage table: `#Work  3`
pub fn format_tag_counts(counts: &[(String, usize)], untagged: usize) -> Vec<String> {
    let width = counts
        .iter()
        .map(|(t, _)| display_width(t) + 1)
        .chain(std::iter::once(display_width("(untagged)")))
        .max()
        .unwrap_or(0);
    let mut lines: Vec<String> = counts
        .iter()
        .map(|(tag, n)| format!("{}  {}", pad_to_width(&format!("#{}", tag), width), n))
        .collect();
    lines.push(format!("{}  {}", pad_to_width("(untagged)", width), untagged));
    lines
}
