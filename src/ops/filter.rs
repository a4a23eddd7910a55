use indexmap::IndexMap;

use crate::model::app_data::{Filters, NO_TAG};
use crate::model::task::{Task, TaskStatus};
use crate::ops::tree;

/// How a filter's tag list is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatch<'a> {
    /// No tag filter
    Any,
    /// Only tasks without tags
    Untagged,
    /// Tasks without tags, or sharing one of these
    UntaggedOr(Vec<&'a str>),
    /// Tasks sharing at least one of these
    AnyOf(Vec<&'a str>),
}

impl<'a> TagMatch<'a> {
    pub fn from_tags(tags: &'a [String]) -> Self {
        if tags.is_empty() {
            return TagMatch::Any;
        }
        let wants_untagged = tags.iter().any(|t| t == NO_TAG);
        let named: Vec<&str> = tags
            .iter()
            .map(|t| t.as_str())
            .filter(|t| *t != NO_TAG)
            .collect();
        match (wants_untagged, named.is_empty()) {
            (true, true) => TagMatch::Untagged,
            (true, false) => TagMatch::UntaggedOr(named),
            (false, _) => TagMatch::AnyOf(named),
        }
    }

    pub fn matches(&self, task_tags: &[String]) -> bool {
        let shares = |wanted: &[&str]| task_tags.iter().any(|t| wanted.contains(&t.as_str()));
        match self {
            TagMatch::Any => true,
            TagMatch::Untagged => task_tags.is_empty(),
            TagMatch::UntaggedOr(wanted) => task_tags.is_empty() || shares(wanted.as_slice()),
            TagMatch::AnyOf(wanted) => shares(wanted.as_slice()),
        }
    }
}

/// A compiled task predicate: status set, tag rule, and lowercase title search
#[derive(Debug, Clone)]
pub struct TaskFilter<'a> {
    statuses: &'a [TaskStatus],
    tags: TagMatch<'a>,
    search: String,
}

impl<'a> TaskFilter<'a> {
    pub fn new(filters: &'a Filters) -> Self {
        TaskFilter {
            statuses: &filters.statuses,
            tags: TagMatch::from_tags(&filters.tags),
            search: filters.search.to_lowercase(),
        }
    }

    /// Does this task, on its own, satisfy every predicate?
    pub fn matches(&self, task: &Task) -> bool {
        self.statuses.contains(&task.status)
            && task.title.to_lowercase().contains(&self.search)
            && self.tags.matches(&task.tags)
    }
}

/// Filter a forest. Matching tasks are kept, and so is any ancestor of a
/// matching task, with its `subtasks` replaced by the filtered children.
/// The input is not modified.
pub fn filter_tree(tasks: &[Task], filters: &Filters) -> Vec<Task> {
    let filter = TaskFilter::new(filters);
    tree::prune(tasks, &|t: &Task| filter.matches(t))
}

/// Usage count per tag over root tasks, in first-seen order.
pub fn tag_counts(tasks: &[Task]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for task in tasks {
        for tag in &task.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Number of root tasks without tags.
pub fn no_tag_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| t.tags.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(id: &str, status: TaskStatus, tags: &[&str], children: Vec<Task>) -> Task {
        let mut t = Task::new(
            id.into(),
            format!("Task {}", id),
            tags.iter().map(|s| s.to_string()).collect(),
            "p".into(),
        );
        t.status = status;
        t.subtasks = children;
        t
    }

    fn filters(statuses: &[TaskStatus], tags: &[&str], search: &str) -> Filters {
        Filters {
            statuses: statuses.to_vec(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            search: search.into(),
            project_id: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn pass_through_ancestor_keeps_matching_child() {
        let tree = vec![task(
            "a",
            TaskStatus::Todo,
            &[],
            vec![task("b", TaskStatus::Done, &[], vec![])],
        )];
        let out = filter_tree(&tree, &filters(&[TaskStatus::Done], &[], ""));
        assert_eq!(ids(&out), vec!["a"]);
        assert_eq!(ids(&out[0].subtasks), vec!["b"]);
        // source untouched
        assert_eq!(tree[0].status, TaskStatus::Todo);
    }

    #[test]
    fn matching_parent_only_keeps_matching_children() {
        let tree = vec![task(
            "a",
            TaskStatus::Todo,
            &[],
            vec![
                task("b", TaskStatus::Done, &[], vec![]),
                task("c", TaskStatus::Todo, &[], vec![]),
            ],
        )];
        let out = filter_tree(&tree, &filters(&[TaskStatus::Todo], &[], ""));
        assert_eq!(ids(&out), vec!["a"]);
        assert_eq!(ids(&out[0].subtasks), vec!["c"]);
    }

    #[test]
    fn non_matching_leaf_is_dropped() {
        let tree = vec![
            task("a", TaskStatus::Todo, &[], vec![]),
            task("b", TaskStatus::Done, &[], vec![]),
        ];
        let out = filter_tree(&tree, &filters(&[TaskStatus::Done], &[], ""));
        assert_eq!(ids(&out), vec!["b"]);
    }

    #[test]
    fn no_tag_sentinel() {
        let tree = vec![task("a", TaskStatus::Todo, &[], vec![])];
        let all = TaskStatus::ALL;
        assert_eq!(filter_tree(&tree, &filters(&all, &[NO_TAG], "")).len(), 1);
        assert_eq!(filter_tree(&tree, &filters(&all, &["work"], "")).len(), 0);
    }

    #[test]
    fn sentinel_plus_named_tags() {
        let tree = vec![
            task("untagged", TaskStatus::Todo, &[], vec![]),
            task("work", TaskStatus::Todo, &["work"], vec![]),
            task("home", TaskStatus::Todo, &["home"], vec![]),
        ];
        let out = filter_tree(&tree, &filters(&TaskStatus::ALL, &[NO_TAG, "work"], ""));
        assert_eq!(ids(&out), vec!["untagged", "work"]);
    }

    #[test]
    fn named_tags_match_any_shared() {
        let tree = vec![
            task("a", TaskStatus::Todo, &["x", "y"], vec![]),
            task("b", TaskStatus::Todo, &["z"], vec![]),
            task("c", TaskStatus::Todo, &[], vec![]),
        ];
        let out = filter_tree(&tree, &filters(&TaskStatus::ALL, &["y", "q"], ""));
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut t = task("a", TaskStatus::Todo, &[], vec![]);
        t.title = "Buy MILK today".into();
        let tree = vec![t, task("b", TaskStatus::Todo, &[], vec![])];
        let out = filter_tree(&tree, &filters(&TaskStatus::ALL, &[], "milk"));
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn empty_status_set_keeps_nothing() {
        let tree = vec![task("a", TaskStatus::Todo, &[], vec![])];
        assert!(filter_tree(&tree, &filters(&[], &[], "")).is_empty());
    }

    #[test]
    fn deep_match_surfaces_whole_chain() {
        let tree = vec![task(
            "r",
            TaskStatus::Todo,
            &[],
            vec![task(
                "m",
                TaskStatus::Todo,
                &[],
                vec![task("leaf", TaskStatus::Todo, &["deep"], vec![])],
            )],
        )];
        let out = filter_tree(&tree, &filters(&TaskStatus::ALL, &["deep"], ""));
        assert_eq!(ids(&out), vec!["r"]);
        assert_eq!(ids(&out[0].subtasks), vec!["m"]);
        assert_eq!(ids(&out[0].subtasks[0].subtasks), vec!["leaf"]);
    }

    #[test]
    fn tag_match_classification() {
        let none: Vec<String> = vec![];
        assert_eq!(TagMatch::from_tags(&none), TagMatch::Any);
        let only = vec![NO_TAG.to_string()];
        assert_eq!(TagMatch::from_tags(&only), TagMatch::Untagged);
    }

    #[test]
    fn counts_over_roots() {
        let tree = vec![
            task("a", TaskStatus::Todo, &["work", "urgent"], vec![
                task("a1", TaskStatus::Todo, &["work"], vec![]),
            ]),
            task("b", TaskStatus::Todo, &["work"], vec![]),
            task("c", TaskStatus::Todo, &[], vec![]),
        ];
        let counts = tag_counts(&tree);
        assert_eq!(counts.get("work"), Some(&2));
        assert_eq!(counts.get("urgent"), Some(&1));
        assert_eq!(counts.keys().next().map(String::as_str), Some("work"));
        assert_eq!(no_tag_count(&tree), 1);
    }
}
