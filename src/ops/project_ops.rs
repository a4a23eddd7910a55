use chrono::Utc;

use crate::model::app_data::{AppData, Filters, ProjectFilters, ProjectStatusFilter};
use crate::model::project::Project;
use crate::model::task::TaskStatus;
use crate::ops::tree;

/// Which root tasks [`delete_tasks_by_filter`] removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    All,
    Status(TaskStatus),
}

impl DeleteScope {
    pub fn parse_scope(s: &str) -> Option<Self> {
        if s == "all" {
            return Some(DeleteScope::All);
        }
        TaskStatus::parse_status(s).map(DeleteScope::Status)
    }
}

/// Root-level task counts per status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionStats {
    pub all: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// Editable project fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Project CRUD
// ---------------------------------------------------------------------------

/// Build a new project with a seeded tag vocabulary.
pub fn new_project(
    id: String,
    name: String,
    description: Option<String>,
    color: String,
    tags: Vec<String>,
    default_tags: &[String],
) -> Project {
    Project {
        id,
        name,
        description: description.filter(|d| !d.is_empty()),
        color,
        created_at: Utc::now(),
        updated_at: None,
        tasks: Vec::new(),
        available_tags: default_tags.to_vec(),
        tags,
    }
}

/// Append a project and make it current.
pub fn add_project(data: &mut AppData, project: Project) {
    data.current_project_id = Some(project.id.clone());
    data.projects.push(project);
}

/// Merge editable fields and stamp `updated_at`. Unknown ids are a no-op.
pub fn update_project(data: &mut AppData, project_id: &str, update: ProjectUpdate) -> bool {
    let Some(project) = data.project_mut(project_id) else {
        return false;
    };
    if let Some(name) = update.name {
        project.name = name;
    }
    if let Some(description) = update.description {
        project.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(color) = update.color {
        project.color = color;
    }
    project.touch();
    true
}

/// Remove a project. If it was current, the first remaining project becomes
/// current, or nothing when none are left.
pub fn delete_project(data: &mut AppData, project_id: &str) -> bool {
    let Some(idx) = data.projects.iter().position(|p| p.id == project_id) else {
        return false;
    };
    data.projects.remove(idx);
    if data.current_project_id.as_deref() == Some(project_id) {
        data.current_project_id = data.projects.first().map(|p| p.id.clone());
    }
    true
}

pub fn set_current_project(data: &mut AppData, project_id: Option<String>) {
    data.current_project_id = project_id;
}

// ---------------------------------------------------------------------------
// Bulk task removal
// ---------------------------------------------------------------------------

/// Drop root tasks (with their subtrees) matching `scope`. Returns how many
/// root tasks were removed.
pub fn delete_tasks_by_filter(project: &mut Project, scope: DeleteScope) -> usize {
    let before = project.tasks.len();
    match scope {
        DeleteScope::All => project.tasks.clear(),
        DeleteScope::Status(status) => project.tasks.retain(|t| t.status != status),
    }
    before - project.tasks.len()
}

pub fn task_stats_for_deletion(project: &Project) -> DeletionStats {
    let mut stats = DeletionStats {
        all: project.tasks.len(),
        ..Default::default()
    };
    for task in &project.tasks {
        match task.status {
            TaskStatus::Todo => stats.todo += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Done => stats.done += 1,
        }
    }
    stats
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Add a classification tag to the project itself.
pub fn add_project_tag(project: &mut Project, tag: &str) -> bool {
    if project.tags.iter().any(|t| t == tag) {
        return false;
    }
    project.tags.push(tag.to_string());
    project.touch();
    true
}

pub fn remove_project_tag(project: &mut Project, tag: &str) -> bool {
    let before = project.tags.len();
    project.tags.retain(|t| t != tag);
    if project.tags.len() == before {
        return false;
    }
    project.touch();
    true
}

/// Add a tag to the project's task vocabulary.
pub fn add_available_tag(project: &mut Project, tag: &str) -> bool {
    if project.available_tags.iter().any(|t| t == tag) {
        return false;
    }
    project.available_tags.push(tag.to_string());
    project.touch();
    true
}

/// Remove a tag from the vocabulary and strip it from every task in the
/// project, at any depth. Every task is stamped.
pub fn remove_available_tag(project: &mut Project, tag: &str) {
    project.available_tags.retain(|t| t != tag);
    tree::walk_mut(&mut project.tasks, &mut |task| {
        task.tags.retain(|t| t != tag);
        task.touch();
    });
    project.touch();
}

/// Sorted union of every project's classification tags.
pub fn all_project_tags(projects: &[Project]) -> Vec<String> {
    let mut tags: Vec<String> = projects.iter().flat_map(|p| p.tags.iter().cloned()).collect();
    tags.sort();
    tags.dedup();
    tags
}

// ---------------------------------------------------------------------------
// Progress & listing
// ---------------------------------------------------------------------------

pub fn project_task_count(project: &Project) -> usize {
    project.tasks.len()
}

/// Rounded share of root tasks that are done; 0 for an empty project.
pub fn project_progress(project: &Project) -> u32 {
    if project.tasks.is_empty() {
        return 0;
    }
    let done = project
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .count();
    ((done as f64 / project.tasks.len() as f64) * 100.0).round() as u32
}

/// Projects passing the project-list filters, in original order.
pub fn filtered_projects<'a>(projects: &'a [Project], filters: &ProjectFilters) -> Vec<&'a Project> {
    let search = filters.search.to_lowercase();
    projects
        .iter()
        .filter(|p| {
            let matches_search = search.is_empty()
                || p.name.to_lowercase().contains(&search)
                || p
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&search));
            let matches_tags =
                filters.tags.is_empty() || filters.tags.iter().any(|t| p.tags.contains(t));
            let progress = project_progress(p);
            let matches_status = match filters.status {
                ProjectStatusFilter::All => true,
                ProjectStatusFilter::Active => progress < 100,
                ProjectStatusFilter::Completed => progress == 100,
            };
            matches_search && matches_tags && matches_status
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// Partial change to the task filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersUpdate {
    pub statuses: Option<Vec<TaskStatus>>,
    pub tags: Option<Vec<String>>,
    pub search: Option<String>,
}

pub fn update_filters(filters: &mut Filters, update: FiltersUpdate) {
    if let Some(statuses) = update.statuses {
        filters.statuses = statuses;
    }
    if let Some(tags) = update.tags {
        filters.tags = tags;
    }
    if let Some(search) = update.search {
        filters.search = search;
    }
}

/// Partial change to the project-list filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiltersUpdate {
    pub search: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ProjectStatusFilter>,
}

pub fn update_project_filters(filters: &mut ProjectFilters, update: ProjectFiltersUpdate) {
    if let Some(search) = update.search {
        filters.search = search;
    }
    if let Some(tags) = update.tags {
        filters.tags = tags;
    }
    if let Some(status) = update.status {
        filters.status = status;
    }
}

pub fn clear_project_filters(filters: &mut ProjectFilters) {
    *filters = ProjectFilters::default();
}
