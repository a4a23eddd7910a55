mod project;
pub use project::cmd_project;

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::store::FileStore;
use crate::io::workspace::Workspace;
use crate::model::app_data::{Filters, NO_TAG};
use crate::model::config::AppConfig;
use crate::model::project::Project;
use crate::model::task::TaskStatus;
use crate::ops::filter;
use crate::ops::project_ops::{self, DeleteScope, FiltersUpdate};
use crate::ops::task_ops::{self, TaskError, TaskUpdate};
use crate::snapshot::{self, SnapshotError};

type CmdResult<T = ()> = Result<T, Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Resolved data directory and settings shared by every command
pub struct Context {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub json: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> CmdResult<Self> {
        let data_dir = config_io::resolve_data_dir(cli.data_dir.as_deref())?;
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            format!(
                "cannot create data directory {}: {}",
                data_dir.display(),
                e
            )
        })?;
        let config = config_io::read_config(&data_dir)?;
        Ok(Context {
            data_dir,
            config,
            json: cli.json,
        })
    }

    /// `logging.dir` when set (relative paths are under the data directory),
    /// otherwise `<data_dir>/logs`.
    pub fn log_dir(&self) -> PathBuf {
        match self.config.logging.dir.as_deref() {
            Some(dir) if !dir.is_empty() => {
                let dir = Path::new(dir);
                if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    self.data_dir.join(dir)
                }
            }
            _ => self.data_dir.join("logs"),
        }
    }

    fn open(&self) -> Workspace<FileStore> {
        let ws = Workspace::open(FileStore::new(&self.data_dir), &self.config);
        if let Some(reason) = ws.load_error() {
            eprintln!(
                "warning: saved data could not be loaded ({}); it will be copied to {} before the next save",
                reason,
                recovery::recovery_log_path(&self.data_dir).display()
            );
        }
        ws
    }

    /// Run `f` against a locked workspace and save before returning.
    fn write<T>(&self, f: impl FnOnce(&mut Workspace<FileStore>) -> CmdResult<T>) -> CmdResult<T> {
        let _lock = FileLock::acquire_default(&self.data_dir)?;
        let mut ws = self.open();
        let out = f(&mut ws)?;
        if !ws.flush_now() {
            return Err(format!(
                "could not save changes (unsaved data was written to {})",
                recovery::recovery_log_path(&self.data_dir).display()
            )
            .into());
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(command: Commands, ctx: &Context) -> CmdResult {
    match command {
        Commands::Project(args) => cmd_project(args, ctx),

        // Read commands
        Commands::List(args) => cmd_list(args, ctx),
        Commands::Show(args) => cmd_show(args, ctx),
        Commands::Tags => cmd_tags(ctx),

        // Write commands
        Commands::Add(args) => cmd_add(args.title, args.tag, args.parent, ctx),
        Commands::Sub(args) => cmd_add(args.title, args.tag, Some(args.id), ctx),
        Commands::Status(args) => cmd_status(&args.id, &args.status, ctx),
        Commands::Start(args) => cmd_status(&args.id, TaskStatus::InProgress.as_str(), ctx),
        Commands::Done(args) => cmd_status(&args.id, TaskStatus::Done.as_str(), ctx),
        Commands::CompleteAll(args) => cmd_complete_all(args, ctx),
        Commands::Title(args) => cmd_title(args, ctx),
        Commands::Tag(args) => cmd_tag(args, ctx),
        Commands::Rm(args) => cmd_rm(args, ctx),
        Commands::Clear(args) => cmd_clear(args, ctx),
        Commands::Filter(args) => cmd_filter(args, ctx),

        // Backup
        Commands::Export(args) => cmd_export(args, ctx),
        Commands::Import(args) => cmd_import(args, ctx),

        Commands::Config(args) => cmd_config(args, ctx),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn current_project(ws: &Workspace<FileStore>) -> CmdResult<&Project> {
    ws.current_project()
        .ok_or_else(|| "no project selected (create one with `arbor project add <name>`)".into())
}

fn clean_title(title: &str) -> CmdResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title cannot be empty".into());
    }
    Ok(title.to_string())
}

fn parse_status(s: &str) -> CmdResult<TaskStatus> {
    TaskStatus::parse_status(s)
        .ok_or_else(|| format!("invalid status '{}' (expected: todo, in-progress, done)", s).into())
}

fn parse_statuses(raw: &[String]) -> CmdResult<Vec<TaskStatus>> {
    raw.iter().map(|s| parse_status(s)).collect()
}

/// Tag list for a filter, with the untagged marker appended when requested
fn filter_tags(tags: Vec<String>, no_tag: bool) -> Vec<String> {
    let mut tags = tags;
    if no_tag && !tags.iter().any(|t| t == NO_TAG) {
        tags.push(NO_TAG.to_string());
    }
    tags
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, ctx: &Context) -> CmdResult {
    let ws = ctx.open();
    let project = current_project(&ws)?;

    let ad_hoc = !args.status.is_empty()
        || !args.tag.is_empty()
        || args.no_tag
        || args.search.is_some();
    let tasks = if ad_hoc {
        let mut filters = Filters::default();
        if !args.status.is_empty() {
            filters.statuses = parse_statuses(&args.status)?;
        }
        filters.tags = filter_tags(args.tag, args.no_tag);
        filters.search = args.search.unwrap_or_default();
        filter::filter_tree(&project.tasks, &filters)
    } else {
        ws.filtered_tasks()
    };

    if ctx.json {
        let items: Vec<TaskJson> = tasks.iter().map(task_to_json).collect();
        return print_json(&items);
    }
    for line in format_task_listing(project, &tasks) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_show(args: IdArg, ctx: &Context) -> CmdResult {
    let ws = ctx.open();
    current_project(&ws)?;
    let id = ws.resolve_task_id(&args.id)?;
    let task = ws
        .find_task(&id)
        .ok_or_else(|| TaskError::NotFound(args.id.clone()))?;

    if ctx.json {
        return print_json(&task_to_json(task));
    }
    for line in format_task_detail(task) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_tags(ctx: &Context) -> CmdResult {
    let ws = ctx.open();
    let project = current_project(&ws)?;
    let counts: Vec<(String, usize)> = filter::tag_counts(&project.tasks).into_iter().collect();
    let untagged = filter::no_tag_count(&project.tasks);

    if ctx.json {
        return print_json(&TagsJson {
            available: project.available_tags.clone(),
            used: counts
                .into_iter()
                .map(|(tag, count)| TagCountJson { tag, count })
                .collect(),
            untagged,
        });
    }
    for line in format_tag_counts(&counts, untagged) {
        println!("{}", line);
    }
    if !project.available_tags.is_empty() {
        println!();
        println!("vocabulary: {}", project.available_tags.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(title: String, tags: Vec<String>, parent: Option<String>, ctx: &Context) -> CmdResult {
    let title = clean_title(&title)?;
    let id = ctx.write(|ws| {
        let parent_id = match parent {
            Some(p) => Some(ws.resolve_task_id(&p)?),
            None => None,
        };
        let outcome = ws.add_task(&title, tags, parent_id.as_deref())?;
        Ok(outcome.id)
    })?;
    println!("{}", id);
    Ok(())
}

fn cmd_status(id: &str, status: &str, ctx: &Context) -> CmdResult {
    let new_status = parse_status(status)?;
    let id = ctx.write(|ws| {
        let id = ws.resolve_task_id(id)?;
        let task = ws
            .find_task(&id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if task.status != new_status && task_ops::status_locked(task) {
            return Err(TaskError::StatusLocked(id).into());
        }
        ws.set_status(&id, new_status);
        Ok(id)
    })?;
    println!("{} → {}", short_id(&id), new_status);
    Ok(())
}

fn cmd_complete_all(args: IdArg, ctx: &Context) -> CmdResult {
    let (id, changed) = ctx.write(|ws| {
        let id = ws.resolve_task_id(&args.id)?;
        let changed = ws.complete_subtree(&id);
        Ok((id, changed))
    })?;
    println!("{} completed {} subtasks", short_id(&id), changed);
    Ok(())
}

fn cmd_title(args: TitleArgs, ctx: &Context) -> CmdResult {
    let title = clean_title(&args.title)?;
    let id = ctx.write(|ws| {
        let id = ws.resolve_task_id(&args.id)?;
        ws.update_task(&id, TaskUpdate::title(title));
        Ok(id)
    })?;
    println!("{} title updated", short_id(&id));
    Ok(())
}

fn cmd_tag(args: TagArgs, ctx: &Context) -> CmdResult {
    let tag = args.tag.trim().to_string();
    if tag.is_empty() {
        return Err("tag cannot be empty".into());
    }
    let (id, changed) = ctx.write(|ws| {
        let id = ws.resolve_task_id(&args.id)?;
        let changed = match args.action.as_str() {
            "add" => ws.add_task_tag(&id, &tag),
            "rm" => ws.remove_task_tag(&id, &tag),
            other => return Err(format!("unknown action '{}' (expected: add, rm)", other).into()),
        };
        Ok((id, changed))
    })?;
    match (changed, args.action.as_str()) {
        (true, _) => println!("{} tag {} {}", short_id(&id), args.action, tag),
        (false, "add") => println!("{} already tagged {}", short_id(&id), tag),
        (false, _) => println!("{} not tagged {}", short_id(&id), tag),
    }
    Ok(())
}

fn cmd_rm(args: IdArg, ctx: &Context) -> CmdResult {
    let id = ctx.write(|ws| {
        let id = ws.resolve_task_id(&args.id)?;
        ws.delete_task(&id);
        Ok(id)
    })?;
    println!("{} deleted", short_id(&id));
    Ok(())
}

fn cmd_clear(args: ClearArgs, ctx: &Context) -> CmdResult {
    let scope = DeleteScope::parse_scope(&args.scope).ok_or_else(|| {
        format!(
            "unknown scope '{}' (expected: all, todo, in-progress, done)",
            args.scope
        )
    })?;

    if !args.yes {
        let ws = ctx.open();
        let stats = project_ops::task_stats_for_deletion(current_project(&ws)?);
        let affected = match scope {
            DeleteScope::All => stats.all,
            DeleteScope::Status(TaskStatus::Todo) => stats.todo,
            DeleteScope::Status(TaskStatus::InProgress) => stats.in_progress,
            DeleteScope::Status(TaskStatus::Done) => stats.done,
        };
        return Err(format!(
            "would delete {} of {} root tasks ({} todo, {} in progress, {} done); pass --yes to confirm",
            affected, stats.all, stats.todo, stats.in_progress, stats.done
        )
        .into());
    }

    let removed = ctx.write(|ws| Ok(ws.delete_tasks_by_filter(scope)?))?;
    println!("deleted {} tasks", removed);
    Ok(())
}

fn cmd_filter(args: FilterArgs, ctx: &Context) -> CmdResult {
    let changes = !args.status.is_empty()
        || !args.tag.is_empty()
        || args.no_tag
        || args.search.is_some();

    let filters = if args.reset {
        ctx.write(|ws| {
            ws.reset_filters();
            Ok(ws.data().filters.clone())
        })?
    } else if changes {
        let statuses = if args.status.is_empty() {
            None
        } else {
            Some(parse_statuses(&args.status)?)
        };
        let tags = (!args.tag.is_empty() || args.no_tag).then(|| filter_tags(args.tag, args.no_tag));
        ctx.write(|ws| {
            ws.update_filters(FiltersUpdate {
                statuses,
                tags,
                search: args.search,
            });
            Ok(ws.data().filters.clone())
        })?
    } else {
        ctx.open().data().filters.clone()
    };

    if ctx.json {
        return print_json(&filters);
    }
    let statuses: Vec<&str> = filters.statuses.iter().map(|s| s.as_str()).collect();
    let tags: Vec<&str> = filters
        .tags
        .iter()
        .map(|t| if t == NO_TAG { "(untagged)" } else { t.as_str() })
        .collect();
    println!("status: {}", statuses.join(", "));
    println!("tags:   {}", if tags.is_empty() { "(any)".to_string() } else { tags.join(", ") });
    println!("search: {}", filters.search);
    Ok(())
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

fn cmd_export(args: ExportArgs, ctx: &Context) -> CmdResult {
    let ws = ctx.open();
    let artifact = ws.export(&args.password)?;
    let path = args
        .path
        .unwrap_or_else(|| PathBuf::from(snapshot::backup_file_name(Utc::now().date_naive())));
    recovery::atomic_write(&path, artifact.as_bytes())
        .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_import(args: ImportArgs, ctx: &Context) -> CmdResult {
    let artifact = std::fs::read_to_string(&args.path)
        .map_err(|e| format!("cannot read {}: {}", args.path.display(), e))?;

    let (warnings, count) = ctx.write(|ws| {
        let previous = serde_json::to_string_pretty(ws.data())?;
        let had_projects = !ws.data().projects.is_empty();
        let warnings = ws.import(&artifact, &args.password).map_err(|e| match e {
            SnapshotError::Crypto => "wrong password or corrupted file".to_string(),
            SnapshotError::Structure(reason) => {
                format!("backup file has an invalid structure: {}", reason)
            }
            other => format!("import failed: {}", other),
        })?;
        if had_projects {
            recovery::log_recovery(
                &ctx.data_dir,
                RecoveryEntry::new(
                    RecoveryCategory::Import,
                    format!("replaced by import of {}", args.path.display()),
                    previous,
                ),
            );
        }
        Ok((warnings, ws.data().projects.len()))
    })?;

    for w in &warnings {
        eprintln!("warning: {}", w);
    }
    println!("imported {} projects", count);
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(args: ConfigCmd, ctx: &Context) -> CmdResult {
    match args.action {
        ConfigAction::Get(a) => {
            println!("{}", config_io::get_value(&ctx.config, &a.key)?);
        }
        ConfigAction::Set(a) => {
            let _lock = FileLock::acquire_default(&ctx.data_dir)?;
            let mut doc = config_io::read_config_doc(&ctx.data_dir)?;
            config_io::set_value(&mut doc, &a.key, &a.value)?;
            config_io::write_config(&ctx.data_dir, &doc)?;
            let config = config_io::read_config(&ctx.data_dir)?;
            println!("{} = {}", a.key, config_io::get_value(&config, &a.key)?);
        }
    }
    Ok(())
}
