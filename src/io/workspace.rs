//! The owned state container.
//!
//! A [`Workspace`] holds one [`AppData`], the store it persists to and a
//! debounce schedule. Every mutation goes through it: it marks the data
//! dirty, pushes the flush deadline out, and the owner decides when to call
//! [`Workspace::poll_flush`] or [`Workspace::flush_now`].

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::io::debounce::Debouncer;
use crate::io::store::{APP_DATA_KEY, KeyValueStore};
use crate::model::app_data::{AppData, Filters};
use crate::model::config::{AppConfig, ProjectDefaults};
use crate::model::project::Project;
use crate::model::task::{Task, TaskStatus};
use crate::ops::filter;
use crate::ops::project_ops::{
    self, DeleteScope, FiltersUpdate, ProjectFiltersUpdate, ProjectUpdate,
};
use crate::ops::task_ops::{self, AddOutcome, MAX_DEPTH, TaskError, TaskUpdate};
use crate::ops::tree::{self, PrefixMatch};
use crate::snapshot::{self, SnapshotError, SnapshotWarning};
use crate::util::ids;

pub struct Workspace<S: KeyValueStore> {
    data: AppData,
    store: S,
    debounce: Debouncer,
    dirty: bool,
    defaults: ProjectDefaults,
    /// Why the stored state was unusable; set until the first flush
    /// preserves it.
    unloaded: Option<String>,
}

impl<S: KeyValueStore> Workspace<S> {
    /// Load persisted state from `store`, migrating older layouts, or start
    /// empty when nothing usable is stored. An unusable stored value is
    /// handed to [`KeyValueStore::preserve`] before the first write
    /// replaces it.
    pub fn open(store: S, config: &AppConfig) -> Self {
        let (data, unloaded) = match store.get(APP_DATA_KEY) {
            Some(raw) => match load_app_data(raw) {
                Ok(data) => (data, None),
                Err(e) => {
                    error!("event=load_failed key={} error={}", APP_DATA_KEY, e);
                    (AppData::default(), Some(e.to_string()))
                }
            },
            None if store.contains(APP_DATA_KEY) => {
                error!("event=load_failed key={} error=unparseable", APP_DATA_KEY);
                (AppData::default(), Some("stored text is not valid JSON".to_string()))
            }
            None => {
                info!("event=load_empty key={}", APP_DATA_KEY);
                (AppData::default(), None)
            }
        };
        Workspace {
            data,
            store,
            debounce: Debouncer::new(Duration::from_millis(config.storage.debounce_ms)),
            dirty: false,
            defaults: config.projects.clone(),
            unloaded,
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.data.current_project()
    }

    fn current_project_mut(&mut self) -> Result<&mut Project, TaskError> {
        self.data
            .current_project_mut()
            .ok_or(TaskError::NoCurrentProject)
    }

    fn current_tasks(&self) -> &[Task] {
        self.current_project()
            .map(|p| p.tasks.as_slice())
            .unwrap_or(&[])
    }

    // -----------------------------------------------------------------------
    // Persistence schedule
    // -----------------------------------------------------------------------

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.debounce.schedule(Instant::now());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Why the stored state could not be loaded, until a flush replaces it.
    pub fn load_error(&self) -> Option<&str> {
        self.unloaded.as_deref()
    }

    /// When the pending write becomes due, if one is pending.
    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Flush if the quiet period has elapsed by `now`. Returns whether a
    /// write was attempted and succeeded.
    pub fn poll_flush(&mut self, now: Instant) -> bool {
        if !self.dirty || !self.debounce.due(now) {
            return false;
        }
        self.flush_at(now)
    }

    /// Write immediately regardless of the schedule. Returns `true` when
    /// nothing was pending or the write succeeded.
    pub fn flush_now(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        self.flush_at(Instant::now())
    }

    fn flush_at(&mut self, now: Instant) -> bool {
        let value = match serde_json::to_value(&self.data) {
            Ok(v) => v,
            Err(e) => {
                error!("event=flush_failed reason=encode error={}", e);
                return false;
            }
        };
        if let Some(reason) = self.unloaded.take() {
            warn!("event=preserve_unloaded key={} reason={}", APP_DATA_KEY, reason);
            self.store.preserve(APP_DATA_KEY, &reason);
        }
        if self.store.set(APP_DATA_KEY, &value) {
            debug!("event=flush projects={}", self.data.projects.len());
            self.dirty = false;
            self.debounce.cancel();
            true
        } else {
            // stay dirty and retry after another quiet period
            warn!("event=flush_failed reason=store");
            self.debounce.schedule(now);
            false
        }
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Create a project seeded with the configured tag vocabulary and make it
    /// current. Returns the new id.
    pub fn add_project(
        &mut self,
        name: &str,
        description: Option<String>,
        color: Option<String>,
        tags: Vec<String>,
    ) -> String {
        let color = color.unwrap_or_else(|| ids::generate_color(&self.defaults.palette));
        let project = project_ops::new_project(
            ids::generate_id(),
            name.to_string(),
            description,
            color,
            tags,
            &self.defaults.default_tags,
        );
        let id = project.id.clone();
        project_ops::add_project(&mut self.data, project);
        info!("event=project_added project={}", id);
        self.mark_dirty();
        id
    }

    pub fn update_project(&mut self, project_id: &str, update: ProjectUpdate) -> bool {
        let changed = project_ops::update_project(&mut self.data, project_id, update);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn delete_project(&mut self, project_id: &str) -> bool {
        let removed = project_ops::delete_project(&mut self.data, project_id);
        if removed {
            info!("event=project_deleted project={}", project_id);
            self.mark_dirty();
        }
        removed
    }

    pub fn set_current_project(&mut self, project_id: &str) -> Result<(), TaskError> {
        if self.data.project(project_id).is_none() {
            return Err(TaskError::ProjectNotFound(project_id.to_string()));
        }
        project_ops::set_current_project(&mut self.data, Some(project_id.to_string()));
        self.mark_dirty();
        Ok(())
    }

    pub fn add_project_tag(&mut self, project_id: &str, tag: &str) -> Result<bool, TaskError> {
        let project = self
            .data
            .project_mut(project_id)
            .ok_or_else(|| TaskError::ProjectNotFound(project_id.to_string()))?;
        let added = project_ops::add_project_tag(project, tag);
        if added {
            self.mark_dirty();
        }
        Ok(added)
    }

    pub fn remove_project_tag(&mut self, project_id: &str, tag: &str) -> Result<bool, TaskError> {
        let project = self
            .data
            .project_mut(project_id)
            .ok_or_else(|| TaskError::ProjectNotFound(project_id.to_string()))?;
        let removed = project_ops::remove_project_tag(project, tag);
        if removed {
            self.mark_dirty();
        }
        Ok(removed)
    }

    /// Add a tag to the current project's task vocabulary.
    pub fn add_available_tag(&mut self, tag: &str) -> Result<bool, TaskError> {
        let added = project_ops::add_available_tag(self.current_project_mut()?, tag);
        if added {
            self.mark_dirty();
        }
        Ok(added)
    }

    /// Drop a tag from the current project's vocabulary and from its tasks.
    pub fn remove_available_tag(&mut self, tag: &str) -> Result<(), TaskError> {
        project_ops::remove_available_tag(self.current_project_mut()?, tag);
        self.mark_dirty();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks (current project)
    // -----------------------------------------------------------------------

    /// Resolve a full id or unique prefix within the current project.
    pub fn resolve_task_id(&self, prefix: &str) -> Result<String, TaskError> {
        match tree::resolve_prefix(self.current_tasks(), prefix) {
            PrefixMatch::Unique(id) => Ok(id),
            PrefixMatch::None => Err(TaskError::NotFound(prefix.to_string())),
            PrefixMatch::Ambiguous(candidates) => Err(TaskError::AmbiguousId {
                prefix: prefix.to_string(),
                candidates,
            }),
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        task_ops::find_task(self.current_tasks(), id)
    }

    /// Whether a subtask may be created under `parent_id`.
    pub fn can_add_subtask(&self, parent_id: &str) -> bool {
        task_ops::can_add_subtask(self.current_tasks(), parent_id)
    }

    /// Add a task to the current project. This is the one place the nesting
    /// limit is enforced.
    pub fn add_task(
        &mut self,
        title: &str,
        tags: Vec<String>,
        parent_id: Option<&str>,
    ) -> Result<AddOutcome, TaskError> {
        let project = self.current_project_mut()?;
        if let Some(pid) = parent_id
            && !task_ops::can_add_subtask(&project.tasks, pid)
        {
            return Err(TaskError::MaxDepthReached);
        }
        let task = Task::new(ids::generate_id(), title.to_string(), tags, project.id.clone());
        let outcome = task_ops::add_task(&mut project.tasks, task, parent_id);
        if outcome.is_degraded() {
            warn!(
                "event=parent_missing task={} requested_parent={}",
                outcome.id,
                parent_id.unwrap_or_default()
            );
        }
        debug!("event=task_added task={} max_depth={}", outcome.id, MAX_DEPTH);
        self.mark_dirty();
        Ok(outcome)
    }

    /// Apply a partial update (propagating status changes). Unknown ids are
    /// a no-op that schedules no write.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> bool {
        let Some(project) = self.data.current_project_mut() else {
            return false;
        };
        let changed = task_ops::update_task(&mut project.tasks, id, update);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> bool {
        self.update_task(id, TaskUpdate::status(status))
    }

    /// Mark every descendant of `id` done. Returns how many changed.
    pub fn complete_subtree(&mut self, id: &str) -> usize {
        let Some(project) = self.data.current_project_mut() else {
            return 0;
        };
        let changed = task_ops::complete_subtree(&mut project.tasks, id);
        if changed > 0 {
            self.mark_dirty();
        }
        changed
    }

    pub fn add_task_tag(&mut self, id: &str, tag: &str) -> bool {
        let Some(task) = self.find_task(id) else {
            return false;
        };
        if task.has_tag(tag) {
            return false;
        }
        let mut tags = task.tags.clone();
        tags.push(tag.to_string());
        self.update_task(id, TaskUpdate::tags(tags))
    }

    pub fn remove_task_tag(&mut self, id: &str, tag: &str) -> bool {
        let Some(task) = self.find_task(id) else {
            return false;
        };
        if !task.has_tag(tag) {
            return false;
        }
        let tags = task.tags.iter().filter(|t| *t != tag).cloned().collect();
        self.update_task(id, TaskUpdate::tags(tags))
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(project) = self.data.current_project_mut() else {
            return false;
        };
        let removed = task_ops::delete_task(&mut project.tasks, id);
        if removed {
            debug!("event=task_deleted task={}", id);
            self.mark_dirty();
        }
        removed
    }

    /// Remove root tasks of the current project by status class.
    pub fn delete_tasks_by_filter(&mut self, scope: DeleteScope) -> Result<usize, TaskError> {
        let removed = project_ops::delete_tasks_by_filter(self.current_project_mut()?, scope);
        if removed > 0 {
            self.mark_dirty();
        }
        Ok(removed)
    }

    /// The current project's forest filtered by the stored task filters.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        filter::filter_tree(self.current_tasks(), &self.data.filters)
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    pub fn update_filters(&mut self, update: FiltersUpdate) {
        project_ops::update_filters(&mut self.data.filters, update);
        self.mark_dirty();
    }

    pub fn reset_filters(&mut self) {
        self.data.filters = Filters::default();
        self.mark_dirty();
    }

    pub fn update_project_filters(&mut self, update: ProjectFiltersUpdate) {
        project_ops::update_project_filters(&mut self.data.project_filters, update);
        self.mark_dirty();
    }

    pub fn clear_project_filters(&mut self) {
        project_ops::clear_project_filters(&mut self.data.project_filters);
        self.mark_dirty();
    }

    // -----------------------------------------------------------------------
    // Backup / restore
    // -----------------------------------------------------------------------

    /// Replace everything with `data`. Keeps the incoming current project
    /// when it resolves, otherwise selects the first project.
    pub fn replace_data(&mut self, mut data: AppData) {
        resolve_current_project(&mut data);
        info!("event=data_replaced projects={}", data.projects.len());
        self.data = data;
        self.mark_dirty();
    }

    pub fn export(&self, password: &str) -> Result<String, SnapshotError> {
        let artifact = snapshot::encode(&self.data, password)?;
        info!("event=export projects={}", self.data.projects.len());
        Ok(artifact)
    }

    /// Decode `artifact` and replace the current data with it. The existing
    /// data is untouched when decoding fails.
    pub fn import(&mut self, artifact: &str, password: &str) -> Result<Vec<SnapshotWarning>, SnapshotError> {
        let decoded = match snapshot::decode(artifact, password) {
            Ok(d) => d,
            Err(e) => {
                warn!("event=import_failed error={}", e);
                return Err(e);
            }
        };
        for w in &decoded.warnings {
            warn!("event=import_warning warning={}", w);
        }
        self.replace_data(decoded.data);
        info!("event=import projects={}", self.data.projects.len());
        Ok(decoded.warnings)
    }
}

// ---------------------------------------------------------------------------
// Loading & migration
// ---------------------------------------------------------------------------

/// Turn a stored value into `AppData`, upgrading older layouts.
pub fn load_app_data(mut raw: Value) -> Result<AppData, serde_json::Error> {
    if migrate_legacy_tags(&mut raw) {
        info!("event=migrate step=available_tags");
    }
    let mut data: AppData = serde_json::from_value(raw)?;
    resolve_current_project(&mut data);
    info!("event=load projects={}", data.projects.len());
    Ok(data)
}

/// Projects without their own `availableTags` inherit the old global list,
/// keeping only tags that one of the project's root tasks uses. Returns
/// whether anything changed.
fn migrate_legacy_tags(raw: &mut Value) -> bool {
    let Some(obj) = raw.as_object_mut() else {
        return false;
    };
    let legacy: Vec<String> = obj
        .get("availableTags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let Some(projects) = obj.get_mut("projects").and_then(Value::as_array_mut) else {
        return false;
    };

    let mut changed = false;
    for project in projects.iter_mut().filter_map(Value::as_object_mut) {
        if project.contains_key("availableTags") {
            continue;
        }
        let used = |tag: &str| {
            project
                .get("tasks")
                .and_then(Value::as_array)
                .is_some_and(|tasks| {
                    tasks.iter().any(|t| {
                        t.get("tags")
                            .and_then(Value::as_array)
                            .is_some_and(|tags| tags.iter().any(|x| x.as_str() == Some(tag)))
                    })
                })
        };
        let inherited: Vec<Value> = legacy
            .iter()
            .filter(|t| used(t.as_str()))
            .map(|t| Value::String(t.clone()))
            .collect();
        project.insert("availableTags".to_string(), Value::Array(inherited));
        changed = true;
    }
    obj.remove("availableTags");
    changed
}

fn resolve_current_project(data: &mut AppData) {
    let resolves = data
        .current_project_id
        .as_deref()
        .is_some_and(|id| data.project(id).is_some());
    if !resolves {
        data.current_project_id = data.projects.first().map(|p| p.id.clone());
    }
}
