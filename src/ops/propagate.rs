//! Upward status propagation.
//!
//! After a task's status changes, each ancestor is re-evaluated from its
//! direct children, nearest first. The walk stops at the first ancestor
//! whose status does not change.

use log::debug;

use crate::model::task::{Task, TaskStatus};
use crate::ops::task_ops::{TaskUpdate, apply_update};
use crate::ops::tree;

/// Decide an ancestor's next status from its direct children and the status
/// the changed child just took. `None` means "leave it alone".
///
/// Rules, first match wins:
/// 1. a done parent whose child re-opened becomes in-progress
/// 2. a parent whose children are all done becomes done
/// 3. a todo parent with an open child becomes in-progress
pub fn next_parent_status(
    parent: TaskStatus,
    children: &[Task],
    trigger: TaskStatus,
) -> Option<TaskStatus> {
    if children.is_empty() {
        return None;
    }
    let any_active = children.iter().any(|c| c.status.is_active());
    let all_done = children.iter().all(|c| c.status == TaskStatus::Done);

    if parent == TaskStatus::Done && trigger != TaskStatus::Done {
        Some(TaskStatus::InProgress)
    } else if all_done && parent != TaskStatus::Done {
        Some(TaskStatus::Done)
    } else if any_active && parent == TaskStatus::Todo {
        Some(TaskStatus::InProgress)
    } else {
        None
    }
}

/// Walk from the task `changed_id` towards its root, applying
/// [`next_parent_status`] one ancestor at a time. Returns the ids of the
/// ancestors whose status changed, nearest first.
pub fn propagate_status(roots: &mut [Task], changed_id: &str, new_status: TaskStatus) -> Vec<String> {
    let mut changed = Vec::new();
    let Some(mut path) = tree::path_to(roots, &|t: &Task| t.id == changed_id) else {
        return changed;
    };
    let mut trigger = new_status;

    while path.len() > 1 {
        path.pop();
        let Some(parent) = tree::node_at(roots, &path) else {
            break;
        };
        let Some(next) = next_parent_status(parent.status, &parent.subtasks, trigger) else {
            break;
        };
        let parent_id = parent.id.clone();
        debug!(
            "event=status_propagated task={} from={} to={}",
            parent_id, parent.status, next
        );
        apply_update(roots, &parent_id, TaskUpdate::status(next));
        changed.push(parent_id);
        trigger = next;
    }
    changed
}
