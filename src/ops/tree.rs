//! Generic walks over a task forest.
//!
//! Lookup, delete, propagation and filtering are all expressed in terms of
//! these helpers, so the recursion lives in exactly one place.

use crate::model::task::Task;

/// Depth-first (pre-order) search. Returns the first node matching `pred`.
pub fn find<'a>(tasks: &'a [Task], pred: &impl Fn(&Task) -> bool) -> Option<&'a Task> {
    for task in tasks {
        if pred(task) {
            return Some(task);
        }
        if let Some(t) = find(&task.subtasks, pred) {
            return Some(t);
        }
    }
    None
}

/// Mutable variant of [`find`].
pub fn find_mut<'a>(tasks: &'a mut [Task], pred: &impl Fn(&Task) -> bool) -> Option<&'a mut Task> {
    for task in tasks.iter_mut() {
        if pred(task) {
            return Some(task);
        }
        if let Some(t) = find_mut(&mut task.subtasks, pred) {
            return Some(t);
        }
    }
    None
}

/// Find a task by id anywhere in the forest.
pub fn find_by_id<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    find(tasks, &|t: &Task| t.id == id)
}

/// Find a task by id anywhere in the forest, mutably.
pub fn find_by_id_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    find_mut(tasks, &|t: &Task| t.id == id)
}

/// Index path from the forest root to the first node matching `pred`.
/// `[2, 0]` means "third root, its first child".
pub fn path_to(tasks: &[Task], pred: &impl Fn(&Task) -> bool) -> Option<Vec<usize>> {
    for (i, task) in tasks.iter().enumerate() {
        if pred(task) {
            return Some(vec![i]);
        }
        if let Some(mut rest) = path_to(&task.subtasks, pred) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

/// Follow an index path. An empty path yields `None`.
pub fn node_at<'a>(tasks: &'a [Task], path: &[usize]) -> Option<&'a Task> {
    let (first, rest) = path.split_first()?;
    let node = tasks.get(*first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at(&node.subtasks, rest)
    }
}

/// Mutable variant of [`node_at`].
pub fn node_at_mut<'a>(tasks: &'a mut [Task], path: &[usize]) -> Option<&'a mut Task> {
    let (first, rest) = path.split_first()?;
    let node = tasks.get_mut(*first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at_mut(&mut node.subtasks, rest)
    }
}

/// Nesting depth of the first node matching `pred` (roots are depth 0).
pub fn depth_of(tasks: &[Task], pred: &impl Fn(&Task) -> bool) -> Option<usize> {
    path_to(tasks, pred).map(|p| p.len() - 1)
}

/// Splice out the first node matching `pred`, taking its whole subtree with it.
/// Each level is scanned before descending into children.
pub fn remove(tasks: &mut Vec<Task>, pred: &impl Fn(&Task) -> bool) -> Option<Task> {
    if let Some(idx) = tasks.iter().position(pred) {
        return Some(tasks.remove(idx));
    }
    for task in tasks.iter_mut() {
        if let Some(removed) = remove(&mut task.subtasks, pred) {
            return Some(removed);
        }
    }
    None
}

/// Rebuild the forest keeping nodes that match `keep` or that have a kept
/// descendant. Kept nodes get their filtered children as `subtasks`; the
/// source is left untouched.
pub fn prune(tasks: &[Task], keep: &impl Fn(&Task) -> bool) -> Vec<Task> {
    let mut out = Vec::new();
    for task in tasks {
        let children = prune(&task.subtasks, keep);
        if keep(task) || !children.is_empty() {
            out.push(Task {
                subtasks: children,
                ..shallow_clone(task)
            });
        }
    }
    out
}

fn shallow_clone(task: &Task) -> Task {
    Task {
        id: task.id.clone(),
        title: task.title.clone(),
        status: task.status,
        tags: task.tags.clone(),
        subtasks: Vec::new(),
        created_at: task.created_at,
        updated_at: task.updated_at,
        project_id: task.project_id.clone(),
    }
}

/// Visit every node in pre-order with its depth.
pub fn walk<'a>(tasks: &'a [Task], f: &mut dyn FnMut(&'a Task, usize)) {
    walk_at(tasks, 0, f);
}

fn walk_at<'a>(tasks: &'a [Task], depth: usize, f: &mut dyn FnMut(&'a Task, usize)) {
    for task in tasks {
        f(task, depth);
        walk_at(&task.subtasks, depth + 1, f);
    }
}

/// Visit every node in pre-order, mutably.
pub fn walk_mut(tasks: &mut [Task], f: &mut dyn FnMut(&mut Task)) {
    for task in tasks.iter_mut() {
        f(task);
        walk_mut(&mut task.subtasks, f);
    }
}

/// Outcome of resolving a user-typed id prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixMatch {
    None,
    Unique(String),
    Ambiguous(Vec<String>),
}

/// Resolve an id or unique id prefix. An exact match always wins.
pub fn resolve_prefix(tasks: &[Task], prefix: &str) -> PrefixMatch {
    if prefix.is_empty() {
        return PrefixMatch::None;
    }
    if find_by_id(tasks, prefix).is_some() {
        return PrefixMatch::Unique(prefix.to_string());
    }
    let mut hits = Vec::new();
    walk(tasks, &mut |t, _| {
        if t.id.starts_with(prefix) {
            hits.push(t.id.clone());
        }
    });
    match hits.len() {
        0 => PrefixMatch::None,
        1 => PrefixMatch::Unique(hits.remove(0)),
        _ => PrefixMatch::Ambiguous(hits),
    }
}
