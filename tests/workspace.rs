use std::time::{Duration, Instant};

use arbor::io::recovery;
use arbor::io::store::{APP_DATA_KEY, FileStore, KeyValueStore, MemoryStore};
use arbor::io::workspace::Workspace;
use arbor::model::app_data::NO_TAG;
use arbor::model::config::AppConfig;
use arbor::model::task::TaskStatus;
use arbor::ops::filter;
use arbor::ops::project_ops::{DeleteScope, FiltersUpdate};
use arbor::ops::task_ops::{self, SubtaskStats, TaskUpdate};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn workspace() -> Workspace<MemoryStore> {
    let mut ws = Workspace::open(MemoryStore::new(), &AppConfig::default());
    ws.add_project("Home", None, None, vec![]);
    ws
}

fn add(ws: &mut Workspace<MemoryStore>, title: &str, parent: Option<&str>) -> String {
    ws.add_task(title, vec![], parent).unwrap().id
}

fn status(ws: &Workspace<MemoryStore>, id: &str) -> TaskStatus {
    ws.find_task(id).unwrap().status
}

/// root -> (mid1 -> leaf1, leaf2), (mid2 -> leaf3)
struct Tree {
    root: String,
    mid1: String,
    mid2: String,
    leaves: Vec<String>,
}

fn three_levels(ws: &mut Workspace<MemoryStore>) -> Tree {
    let root = add(ws, "root", None);
    let mid1 = add(ws, "mid1", Some(&root));
    let mid2 = add(ws, "mid2", Some(&root));
    let leaves = vec![
        add(ws, "leaf1", Some(&mid1)),
        add(ws, "leaf2", Some(&mid1)),
        add(ws, "leaf3", Some(&mid2)),
    ];
    Tree {
        root,
        mid1,
        mid2,
        leaves,
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[test]
fn all_done_leaves_complete_every_ancestor() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    for leaf in &tree.leaves {
        ws.set_status(leaf, TaskStatus::Done);
    }
    assert_eq!(status(&ws, &tree.mid1), TaskStatus::Done);
    assert_eq!(status(&ws, &tree.mid2), TaskStatus::Done);
    assert_eq!(status(&ws, &tree.root), TaskStatus::Done);
}

#[test]
fn reopening_a_leaf_reopens_done_ancestors() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    for leaf in &tree.leaves {
        ws.set_status(leaf, TaskStatus::Done);
    }
    ws.set_status(&tree.leaves[0], TaskStatus::InProgress);

    assert_eq!(status(&ws, &tree.mid1), TaskStatus::InProgress);
    assert_eq!(status(&ws, &tree.root), TaskStatus::InProgress);
    // the other branch is untouched
    assert_eq!(status(&ws, &tree.mid2), TaskStatus::Done);
}

#[test]
fn repeated_update_converges() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    ws.set_status(&tree.leaves[2], TaskStatus::Done);
    let once = ws.data().clone();

    ws.set_status(&tree.leaves[2], TaskStatus::Done);
    let project = ws.current_project().unwrap();
    let before = &once.current_project().unwrap().tasks;
    // only the leaf itself is re-stamped
    let statuses = |tasks: &[arbor::model::task::Task]| {
        let mut out = Vec::new();
        arbor::ops::tree::walk(tasks, &mut |t, _| out.push((t.id.clone(), t.status)));
        out
    };
    assert_eq!(statuses(&project.tasks), statuses(before));
}

#[test]
fn starting_a_leaf_starts_todo_ancestors() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    ws.set_status(&tree.leaves[1], TaskStatus::InProgress);
    assert_eq!(status(&ws, &tree.mid1), TaskStatus::InProgress);
    assert_eq!(status(&ws, &tree.root), TaskStatus::InProgress);
    assert_eq!(status(&ws, &tree.mid2), TaskStatus::Todo);
}

#[test]
fn complete_subtree_finishes_branch() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    assert_eq!(ws.complete_subtree(&tree.mid1), 2);
    assert_eq!(status(&ws, &tree.mid1), TaskStatus::Done);
    assert_eq!(status(&ws, &tree.root), TaskStatus::InProgress);
    assert!(task_ops::status_locked(ws.find_task(&tree.root).unwrap()));
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn cascading_delete_spares_siblings_and_ancestors() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    let other = add(&mut ws, "other root", None);

    assert!(ws.delete_task(&tree.mid1));
    assert!(ws.find_task(&tree.mid1).is_none());
    assert!(ws.find_task(&tree.leaves[0]).is_none());
    assert!(ws.find_task(&tree.leaves[1]).is_none());
    assert!(ws.find_task(&tree.root).is_some());
    assert!(ws.find_task(&tree.mid2).is_some());
    assert!(ws.find_task(&other).is_some());
}

#[test]
fn progress_math() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    let leaf = ws.find_task(&tree.leaves[0]).unwrap();
    assert_eq!(task_ops::subtask_progress(leaf), 100.0);

    ws.set_status(&tree.leaves[0], TaskStatus::Done);
    let root = ws.find_task(&tree.root).unwrap();
    let stats = SubtaskStats::of(root);
    assert_eq!(stats.total, 5);
    assert_eq!(stats.completed, 1);
    assert_eq!(task_ops::subtask_progress(ws.find_task(&tree.mid1).unwrap()), 50.0);
}

#[test]
fn missing_parent_lands_at_root() {
    let mut ws = workspace();
    add(&mut ws, "a", None);
    let outcome = ws.add_task("stray", vec![], Some("ghost")).unwrap();
    assert!(outcome.is_degraded());
    let roots = &ws.current_project().unwrap().tasks;
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[1].title, "stray");
}

#[test]
fn clear_by_status_only_touches_roots() {
    let mut ws = workspace();
    let a = add(&mut ws, "a", None);
    add(&mut ws, "b", None);
    ws.set_status(&a, TaskStatus::Done);
    assert_eq!(ws.delete_tasks_by_filter(DeleteScope::Status(TaskStatus::Done)).unwrap(), 1);
    assert_eq!(ws.current_project().unwrap().tasks.len(), 1);
    assert_eq!(ws.delete_tasks_by_filter(DeleteScope::All).unwrap(), 1);
    assert!(ws.current_project().unwrap().tasks.is_empty());
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[test]
fn status_filter_keeps_pass_through_parent() {
    let mut ws = workspace();
    let a = add(&mut ws, "A", None);
    let b = add(&mut ws, "B", Some(&a));
    let c = add(&mut ws, "C", Some(&a));
    ws.set_status(&b, TaskStatus::Done);
    ws.update_filters(FiltersUpdate {
        statuses: Some(vec![TaskStatus::Done]),
        ..Default::default()
    });

    let filtered = ws.filtered_tasks();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, a);
    let kept: Vec<&str> = filtered[0].subtasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(kept, vec![b.as_str()]);
    // source tree untouched
    assert!(ws.find_task(&c).is_some());
    assert_eq!(ws.find_task(&a).unwrap().subtasks.len(), 2);
}

#[test]
fn no_tag_sentinel() {
    let mut ws = workspace();
    let plain = add(&mut ws, "plain", None);
    let tagged = ws.add_task("tagged", vec!["Work".into()], None).unwrap().id;

    ws.update_filters(FiltersUpdate {
        tags: Some(vec![NO_TAG.into()]),
        ..Default::default()
    });
    let ids: Vec<String> = ws.filtered_tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![plain]);

    ws.update_filters(FiltersUpdate {
        tags: Some(vec!["work".into()]),
        ..Default::default()
    });
    // tag matching is exact
    assert!(ws.filtered_tasks().is_empty());

    ws.update_filters(FiltersUpdate {
        tags: Some(vec!["Work".into(), NO_TAG.into()]),
        ..Default::default()
    });
    assert_eq!(ws.filtered_tasks().len(), 2);

    ws.reset_filters();
    let project = ws.current_project().unwrap();
    assert_eq!(filter::no_tag_count(&project.tasks), 1);
    assert_eq!(filter::tag_counts(&project.tasks).get("Work"), Some(&1));
    assert!(ws.find_task(&tagged).unwrap().has_tag("Work"));
}

#[test]
fn search_is_case_insensitive() {
    let mut ws = workspace();
    let a = add(&mut ws, "Renovate kitchen", None);
    add(&mut ws, "Order TILES", Some(&a));
    add(&mut ws, "Walk dog", None);
    ws.update_filters(FiltersUpdate {
        search: Some("tiles".into()),
        ..Default::default()
    });
    let filtered = ws.filtered_tasks();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].subtasks[0].title, "Order TILES");
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn debounced_flush_waits_for_quiet_period() {
    let config = AppConfig::default();
    let mut ws = Workspace::open(MemoryStore::new(), &config);
    ws.add_project("Home", None, None, vec![]);
    add(&mut ws, "a", None);

    let deadline = ws.next_flush_deadline().unwrap();
    assert!(!ws.poll_flush(deadline - Duration::from_millis(1)));
    assert!(ws.is_dirty());
    assert!(ws.poll_flush(deadline + Duration::from_millis(1)));
    assert!(!ws.is_dirty());
    assert_eq!(ws.store().writes(), 1);
    assert!(!ws.poll_flush(Instant::now() + Duration::from_secs(10)));
}

#[test]
fn file_store_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = AppConfig::default();

    let mut ws = Workspace::open(FileStore::new(tmp.path()), &config);
    ws.add_project("Home", Some("house stuff".into()), None, vec!["family".into()]);
    let id = ws.add_task("Fix sink", vec!["Urgent".into()], None).unwrap().id;
    ws.update_task(&id, TaskUpdate::status(TaskStatus::InProgress));
    assert!(ws.flush_now());
    let saved = ws.data().clone();

    let reopened = Workspace::open(FileStore::new(tmp.path()), &config);
    assert_eq!(reopened.data(), &saved);
    assert_eq!(reopened.current_project().unwrap().name, "Home");

    let raw = FileStore::new(tmp.path()).get(APP_DATA_KEY).unwrap();
    assert_eq!(raw["projects"][0]["tasks"][0]["status"], "in-progress");
    assert_eq!(raw["currentProjectId"], saved.current_project_id.clone().unwrap());
}

#[test]
fn export_import_through_workspace() {
    let mut ws = workspace();
    let tree = three_levels(&mut ws);
    ws.set_status(&tree.leaves[0], TaskStatus::Done);
    let artifact = ws.export("hunter22").unwrap();
    let expected = ws.data().clone();

    let mut fresh = Workspace::open(MemoryStore::new(), &AppConfig::default());
    let warnings = fresh.import(&artifact, "hunter22").unwrap();
    assert!(warnings.is_empty());
    assert_eq!(fresh.data(), &expected);
    assert!(fresh.is_dirty());
    assert!(fresh.flush_now());
}

/// Open `raw` as stored state, make one change and flush it.
fn overwrite_stored(raw: &str) -> (TempDir, Workspace<FileStore>) {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::new(tmp.path());
    std::fs::write(store.path_for(APP_DATA_KEY), raw).unwrap();

    let mut ws = Workspace::open(store, &AppConfig::default());
    assert!(ws.data().projects.is_empty());
    assert!(ws.load_error().is_some());
    ws.add_project("New", None, None, vec![]);
    assert!(ws.flush_now());
    (tmp, ws)
}

#[test]
fn unknown_status_is_preserved_before_overwrite() {
    let raw = r##"{"projects": [{"id": "p1", "name": "Precious", "color": "#000000",
        "createdAt": "2024-01-01T00:00:00Z",
        "tasks": [{"id": "t1", "title": "T", "status": "blocked", "tags": [],
            "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}]}]}"##;
    let (tmp, ws) = overwrite_stored(raw);

    let log = std::fs::read_to_string(recovery::recovery_log_path(tmp.path())).unwrap();
    assert!(log.contains("load: could not load"));
    assert!(log.contains("\"blocked\""));
    assert!(log.contains("Precious"));
    assert_eq!(ws.current_project().unwrap().name, "New");
    assert!(ws.load_error().is_none());
}

#[test]
fn invalid_json_is_preserved_before_overwrite() {
    let (tmp, _ws) = overwrite_stored("{\"projects\": [{\"name\": \"Precious\"");

    let log = std::fs::read_to_string(recovery::recovery_log_path(tmp.path())).unwrap();
    assert!(log.contains("not valid JSON"));
    assert!(log.contains("{\"projects\": [{\"name\": \"Precious\""));
    let raw = FileStore::new(tmp.path()).get(APP_DATA_KEY).unwrap();
    assert_eq!(raw["projects"][0]["name"], "New");
}

#[test]
fn clean_reopen_writes_no_recovery_entry() {
    let tmp = TempDir::new().unwrap();
    let mut ws = Workspace::open(FileStore::new(tmp.path()), &AppConfig::default());
    ws.add_project("Home", None, None, vec![]);
    assert!(ws.flush_now());
    let mut ws = Workspace::open(FileStore::new(tmp.path()), &AppConfig::default());
    assert!(ws.load_error().is_none());
    ws.add_project("Work", None, None, vec![]);
    assert!(ws.flush_now());
    assert!(!recovery::recovery_log_path(tmp.path()).exists());
}

#[test]
fn removing_missing_project_tag_schedules_nothing() {
    let mut ws = workspace();
    let id = ws.current_project().unwrap().id.clone();
    assert!(ws.flush_now());
    assert!(!ws.remove_project_tag(&id, "ghost").unwrap());
    assert!(!ws.is_dirty());
    assert!(ws.add_project_tag(&id, "family").unwrap());
    assert!(ws.remove_project_tag(&id, "family").unwrap());
    assert!(ws.is_dirty());
}
