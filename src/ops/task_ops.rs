use crate::model::task::{Task, TaskStatus};
use crate::ops::propagate::propagate_status;
use crate::ops::tree;

/// Deepest level a subtask may be created at (roots are level 0).
pub const MAX_DEPTH: usize = 2;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("ambiguous task id '{prefix}' matches {}", .candidates.join(", "))]
    AmbiguousId {
        prefix: String,
        candidates: Vec<String>,
    },
    #[error("cannot add subtask: maximum nesting depth ({}) reached", MAX_DEPTH + 1)]
    MaxDepthReached,
    #[error("status of {0} follows its open subtasks; finish them or use complete-all")]
    StatusLocked(String),
    #[error("no project selected")]
    NoCurrentProject,
    #[error("project not found: {0}")]
    ProjectNotFound(String),
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Depth-first lookup by id across the whole forest.
pub fn find_task<'a>(roots: &'a [Task], id: &str) -> Option<&'a Task> {
    tree::find_by_id(roots, id)
}

pub fn find_task_mut<'a>(roots: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    tree::find_by_id_mut(roots, id)
}

/// Parent of the task with `id`, if it is not a root.
pub fn find_parent<'a>(roots: &'a [Task], id: &str) -> Option<&'a Task> {
    tree::find(roots, &|t: &Task| t.subtasks.iter().any(|c| c.id == id))
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Where a newly added task ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Appended as a root task
    Root,
    /// Appended as the last child of `parent_id`
    Child { parent_id: String },
    /// A parent was requested but not found; the task became a root instead
    OrphanedToRoot { requested_parent: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub id: String,
    pub placement: Placement,
}

impl AddOutcome {
    /// True when the caller asked for a parent that did not resolve
    pub fn is_degraded(&self) -> bool {
        matches!(self.placement, Placement::OrphanedToRoot { .. })
    }
}

/// Append `task` under `parent_id` (stamping only the parent's `updated_at`),
/// or as a root when no parent is given or the parent cannot be found.
///
/// Titles are stored as given; callers trim and reject empty input.
/// Depth is not checked here, see [`can_add_subtask`].
pub fn add_task(roots: &mut Vec<Task>, task: Task, parent_id: Option<&str>) -> AddOutcome {
    let id = task.id.clone();
    let placement = match parent_id {
        Some(pid) => match find_task_mut(roots, pid) {
            Some(parent) => {
                parent.subtasks.push(task);
                parent.touch();
                Placement::Child {
                    parent_id: pid.to_string(),
                }
            }
            None => {
                roots.push(task);
                Placement::OrphanedToRoot {
                    requested_parent: pid.to_string(),
                }
            }
        },
        None => {
            roots.push(task);
            Placement::Root
        }
    };
    AddOutcome { id, placement }
}

/// Nesting depth of a task (roots are 0).
pub fn depth_of(roots: &[Task], id: &str) -> Option<usize> {
    tree::depth_of(roots, &|t: &Task| t.id == id)
}

/// Whether a child may be added under `parent_id`. Unknown parents report
/// `true` since [`add_task`] would place the task at the root.
pub fn can_add_subtask(roots: &[Task], parent_id: &str) -> bool {
    depth_of(roots, parent_id).is_none_or(|d| d < MAX_DEPTH)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Partial update applied by [`update_task`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub tags: Option<Vec<String>>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        TaskUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        TaskUpdate {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn tags(tags: Vec<String>) -> Self {
        TaskUpdate {
            tags: Some(tags),
            ..Default::default()
        }
    }
}

/// Merge `update` into the task, always stamping `updated_at`.
/// Returns the previous status, or `None` if the id is unknown.
pub(crate) fn apply_update(roots: &mut [Task], id: &str, update: TaskUpdate) -> Option<TaskStatus> {
    let task = find_task_mut(roots, id)?;
    let old_status = task.status;
    if let Some(title) = update.title {
        task.title = title;
    }
    if let Some(status) = update.status {
        task.status = status;
    }
    if let Some(tags) = update.tags {
        task.tags = tags;
    }
    task.touch();
    Some(old_status)
}

/// Update a task and, if its status changed, propagate the change to its
/// ancestors. Unknown ids are a no-op and return `false`.
pub fn update_task(roots: &mut [Task], id: &str, update: TaskUpdate) -> bool {
    let new_status = update.status;
    let Some(old_status) = apply_update(roots, id, update) else {
        return false;
    };
    if let Some(status) = new_status
        && status != old_status
    {
        propagate_status(roots, id, status);
    }
    true
}

/// Mark every descendant of `id` done, one update at a time so that each
/// change propagates upward. Returns how many descendants changed status.
pub fn complete_subtree(roots: &mut [Task], id: &str) -> usize {
    let Some(task) = find_task(roots, id) else {
        return 0;
    };
    let mut pending = Vec::new();
    tree::walk(&task.subtasks, &mut |t, _| {
        if t.status != TaskStatus::Done {
            pending.push(t.id.clone());
        }
    });
    for child_id in &pending {
        update_task(roots, child_id, TaskUpdate::status(TaskStatus::Done));
    }
    pending.len()
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Remove the first task with `id` together with its subtree.
/// Returns `true` only if something was removed.
pub fn delete_task(roots: &mut Vec<Task>, id: &str) -> bool {
    tree::remove(roots, &|t: &Task| t.id == id).is_some()
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Descendant counts for a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubtaskStats {
    /// All descendants, excluding the task itself
    pub total: usize,
    /// Descendants with status `done`
    pub completed: usize,
}

impl SubtaskStats {
    pub fn of(task: &Task) -> Self {
        let mut stats = SubtaskStats::default();
        tree::walk(&task.subtasks, &mut |t, _| {
            stats.total += 1;
            if t.status == TaskStatus::Done {
                stats.completed += 1;
            }
        });
        stats
    }

    /// Percentage done; a task with no descendants is vacuously complete.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.completed as f64 / self.total as f64
        }
    }
}

pub fn total_subtask_count(task: &Task) -> usize {
    SubtaskStats::of(task).total
}

pub fn completed_subtask_count(task: &Task) -> usize {
    SubtaskStats::of(task).completed
}

pub fn subtask_progress(task: &Task) -> f64 {
    SubtaskStats::of(task).progress()
}

/// True if any descendant, at any depth, is not done.
pub fn has_incomplete_descendant(task: &Task) -> bool {
    tree::find(&task.subtasks, &|t: &Task| t.status != TaskStatus::Done).is_some()
}

/// A task that is not done but still has open descendants cannot be
/// switched by hand; its status follows its children.
pub fn status_locked(task: &Task) -> bool {
    task.status != TaskStatus::Done && has_incomplete_descendant(task)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn task(id: &str) -> Task {
        Task::new(id.into(), format!("Task {}", id), vec![], "p".into())
    }

    fn with_children(mut t: Task, children: Vec<Task>) -> Task {
        t.subtasks = children;
        t
    }

    fn with_status(mut t: Task, status: TaskStatus) -> Task {
        t.status = status;
        t
    }

    fn aged(mut t: Task) -> Task {
        let past = Utc::now() - Duration::days(3);
        t.created_at = past;
        t.updated_at = past;
        t
    }

    #[test]
    fn add_root_task() {
        let mut roots = vec![task("a")];
        let outcome = add_task(&mut roots, task("b"), None);
        assert_eq!(outcome.placement, Placement::Root);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].id, "b");
    }

    #[test]
    fn add_child_stamps_parent_only() {
        let mut roots = vec![aged(with_children(task("a"), vec![aged(task("a1"))]))];
        let before = roots[0].updated_at;
        let outcome = add_task(&mut roots, task("new"), Some("a1"));
        assert_eq!(
            outcome.placement,
            Placement::Child {
                parent_id: "a1".into()
            }
        );
        assert_eq!(roots[0].subtasks[0].subtasks[0].id, "new");
        assert!(roots[0].subtasks[0].updated_at > before);
        // grandparent untouched
        assert_eq!(roots[0].updated_at, before);
    }

    #[test]
    fn add_with_missing_parent_falls_back_to_root() {
        let mut roots = vec![task("a")];
        let outcome = add_task(&mut roots, task("b"), Some("ghost"));
        assert!(outcome.is_degraded());
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut roots = vec![task("a")];
        add_task(&mut roots, task("x"), Some("a"));
        add_task(&mut roots, task("y"), Some("a"));
        add_task(&mut roots, task("z"), Some("a"));
        let ids: Vec<&str> = roots[0].subtasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn can_add_subtask_respects_max_depth() {
        let roots = vec![with_children(
            task("a"),
            vec![with_children(task("a1"), vec![task("a1x")])],
        )];
        assert!(can_add_subtask(&roots, "a"));
        assert!(can_add_subtask(&roots, "a1"));
        assert!(!can_add_subtask(&roots, "a1x"));
        assert!(can_add_subtask(&roots, "missing"));
    }

    #[test]
    fn update_merges_fields_and_stamps() {
        let mut roots = vec![aged(task("a"))];
        let before = roots[0].updated_at;
        assert!(update_task(&mut roots, "a", TaskUpdate::title("Renamed")));
        assert_eq!(roots[0].title, "Renamed");
        assert!(roots[0].updated_at > before);

        update_task(&mut roots, "a", TaskUpdate::tags(vec!["Work".into()]));
        assert_eq!(roots[0].tags, vec!["Work".to_string()]);
        assert_eq!(roots[0].title, "Renamed");
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let mut roots = vec![task("a")];
        let snapshot = roots.clone();
        assert!(!update_task(&mut roots, "nope", TaskUpdate::status(TaskStatus::Done)));
        assert_eq!(roots, snapshot);
    }

    #[test]
    fn update_status_propagates() {
        let mut roots = vec![with_children(task("a"), vec![task("a1")])];
        update_task(&mut roots, "a1", TaskUpdate::status(TaskStatus::Done));
        assert_eq!(roots[0].status, TaskStatus::Done);
    }

    #[test]
    fn delete_cascades_and_spares_siblings() {
        let mut roots = vec![
            with_children(
                task("a"),
                vec![
                    with_children(task("a1"), vec![with_children(task("a1x"), vec![task("a1xy")])]),
                    task("a2"),
                ],
            ),
            task("b"),
        ];
        assert!(delete_task(&mut roots, "a1"));
        assert!(find_task(&roots, "a1").is_none());
        assert!(find_task(&roots, "a1x").is_none());
        assert!(find_task(&roots, "a1xy").is_none());
        assert!(find_task(&roots, "a2").is_some());
        assert!(find_task(&roots, "b").is_some());
        assert_eq!(roots[0].subtasks.len(), 1);
    }

    #[test]
    fn delete_missing_returns_false() {
        let mut roots = vec![task("a")];
        assert!(!delete_task(&mut roots, "zzz"));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn progress_of_leaf_is_100() {
        let t = task("a");
        assert_eq!(total_subtask_count(&t), 0);
        assert_eq!(subtask_progress(&t), 100.0);
    }

    #[test]
    fn progress_counts_all_descendants() {
        let t = with_children(
            task("a"),
            vec![
                with_children(
                    task("a1"),
                    vec![with_status(task("a1x"), TaskStatus::Done), task("a1y")],
                ),
                task("a2"),
            ],
        );
        assert_eq!(total_subtask_count(&t), 4);
        assert_eq!(completed_subtask_count(&t), 1);
        assert_eq!(subtask_progress(&t), 25.0);
    }

    #[test]
    fn incomplete_descendant_found_deep() {
        let t = with_children(
            task("a"),
            vec![with_status(
                with_children(task("a1"), vec![task("a1x")]),
                TaskStatus::Done,
            )],
        );
        assert!(has_incomplete_descendant(&t));
        assert!(status_locked(&t));

        let done = with_status(t.clone(), TaskStatus::Done);
        assert!(!status_locked(&done));
    }

    #[test]
    fn complete_subtree_finishes_everything() {
        let mut roots = vec![with_children(
            task("a"),
            vec![with_children(task("a1"), vec![task("a1x"), task("a1y")]), task("a2")],
        )];
        let changed = complete_subtree(&mut roots, "a");
        assert_eq!(changed, 4);
        assert_eq!(roots[0].status, TaskStatus::Done);
        assert!(!has_incomplete_descendant(&roots[0]));
    }

    #[test]
    fn find_parent_of_nested() {
        let roots = vec![with_children(task("a"), vec![with_children(task("a1"), vec![task("a1x")])])];
        assert_eq!(find_parent(&roots, "a1x").unwrap().id, "a1");
        assert!(find_parent(&roots, "a").is_none());
    }
}
